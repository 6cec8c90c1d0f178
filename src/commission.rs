//! Accent- and case-insensitive detection of bank commission lines.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Keywords that identify a bank commission, after normalization. Substring
/// match, not tokenized: a keyword anywhere in the text triggers a match.
pub const COMMISSION_KEYWORDS: &[&str] = &[
    "COMISION",
    "MANTENIMIENTO DE CUENTA",
    "MANTENIMIENTO CTA",
    "USO DE CANAL",
    "COBRO SMS",
    "MENSAJERIA DE TEXTO",
    "IGTF",
    "IMPUESTO GRANDES TRANSACCIONES",
    "GASTOS ADMINISTRATIVOS",
    "GASTO ADMINISTRATIVO",
    "CARGO BANCARIO",
    "TARIFA BANCARIA",
    "SERVICIO DE BANCA",
];

/// NFD-decomposes, drops combining marks and uppercases.
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

/// True iff the normalized text contains any commission keyword.
pub fn matches(text: &str) -> bool {
    let normalized = normalize(text);
    COMMISSION_KEYWORDS
        .iter()
        .any(|keyword| normalized.contains(keyword))
}

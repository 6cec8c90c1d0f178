pub mod bank;
pub mod payments;
pub mod periods;
pub mod rates;
pub mod statement;
pub mod ui;

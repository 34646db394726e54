mod money;

pub mod op;

pub use money::{Money, MoneyConversionError, KES_CURRENCY_CODE, KES_CURRENCY_CODE_LOWER};

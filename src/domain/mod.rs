mod currency;
mod debt;
mod exchange_rate;
mod maintenance;
mod money;
mod payment;
mod statistics;
mod summary;

pub use currency::*;
pub use debt::*;
pub use exchange_rate::*;
pub use maintenance::*;
pub use money::*;
pub use payment::*;
pub use statistics::*;
pub use summary::*;

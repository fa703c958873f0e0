mod chd;
mod config;
mod dat;
mod playlist;
mod transform;

pub use chd::*;
pub use config::*;
pub use dat::*;
pub use playlist::*;
pub use transform::*;

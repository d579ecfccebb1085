//! 수집 파이프라인 모델.

mod chunk;
mod plan;
mod request;
mod state;
mod status;

pub use chunk::*;
pub use plan::*;
pub use request::*;
pub use state::*;
pub use status::*;

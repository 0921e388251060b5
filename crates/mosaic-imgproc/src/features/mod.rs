mod descriptor;
pub use descriptor::*;

mod error;
pub use error::FeatureError;

mod matching;
pub use matching::*;

mod peaks;
pub use peaks::*;

mod responses;
pub use responses::*;

pub mod concept;
pub mod errors;
pub mod event;
pub mod ids;
pub mod mastery;
pub mod profile;
pub mod result;

pub use concept::*;
pub use errors::*;
pub use event::*;
pub use ids::*;
pub use mastery::*;
pub use profile::*;
pub use result::*;



pub mod db;
pub mod public;
pub mod router;

pub use router::{manage_router, router};

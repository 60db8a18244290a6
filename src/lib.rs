pub mod assets;
pub mod camera;
pub mod capture;
pub mod compositor;
pub mod config;
pub mod cropper;
pub mod customization;
pub mod error;
pub mod export;
pub mod filters;
pub mod layout;
pub mod media_type;
pub mod photo;
pub mod session;
pub mod template;
pub mod text;
pub mod timestamp;

pub use compositor::{CompositeCanvas, Compositor};
pub use customization::Customization;
pub use error::{BoothError, BoothResult};
pub use photo::{PhotoSet, RasterImage};
pub use session::BoothSession;

pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{Coordinates, ServiceRecord};
pub use crate::domain::ports::{ConfigProvider, Geocoder, SearchIndex};
pub use crate::utils::error::Result;

// Adapters layer: HTTP implementations of the domain ports.

pub mod elasticsearch;
pub mod geocoder;

pub use elasticsearch::ElasticsearchClient;
pub use geocoder::GoogleGeocoder;

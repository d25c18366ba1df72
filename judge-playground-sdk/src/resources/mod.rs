//! SDK resource modules
//!
//! One client per backend area. All of them share a single [`HttpClient`](crate::HttpClient).

pub mod datasets;
pub mod evaluations;
pub mod generations;
pub mod labeling;
pub mod models;

pub use datasets::DatasetsClient;
pub use evaluations::EvaluationsClient;
pub use generations::GenerationsClient;
pub use labeling::LabelingClient;
pub use models::ModelsClient;

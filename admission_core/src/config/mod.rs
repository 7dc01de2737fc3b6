pub mod settings;

pub use settings::AdmissionConfig;

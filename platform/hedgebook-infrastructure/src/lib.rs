pub mod artifacts;
pub mod http;
pub mod metatrader;
pub mod salesforce;

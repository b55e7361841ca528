//! Built-in model instance clients

pub mod echo;
pub mod remote;

pub use echo::EchoModel;
pub use remote::RemoteModel;

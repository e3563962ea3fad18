//! # ZapDrip Channels
//! Outbound transport implementations.

pub mod console;
pub mod whatsapp;

pub use console::ConsoleTransport;
pub use whatsapp::WhatsAppTransport;

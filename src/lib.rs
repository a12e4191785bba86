//! # dexbot
//!
//! A Telegram bot that looks up Romanian words on dexonline.ro and renders
//! their definitions as Telegram HTML messages, inline results and a daily
//! word of the day.
//!
//! The rendering pipeline is pure and synchronous:
//! [`markup`] parses definition markup, [`sanitizer`] and [`word_linker`]
//! turn it into balanced fragments, [`assembler`] fits them into the message
//! length budget and [`definition`] ties it all together. [`pagination`]
//! encodes the state carried by keyboard buttons.

pub mod analytics;
pub mod assembler;
pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod definition;
pub mod dex_client;
pub mod errors;
pub mod localization;
pub mod markup;
pub mod pagination;
pub mod sanitizer;
pub mod subscription;
pub mod telemetry;
pub mod word_linker;

#![forbid(unsafe_code)]

//! StreetTube: a self-contained video hub for the car scene.
//!
//! The crate owns the whole data layer of the hub: a key-value persistence
//! adapter backed by a local SQLite file, the in-memory entity collections
//! (users, videos, subscriptions, likes, watch history, comments, watch
//! later, notifications), the derived feed selector, and every cross-entity
//! mutation (likes, subscriptions, comments, uploads, cascading deletes).
//! The `backend` binary exposes all of it over HTTP to the web client.

pub mod auth;
pub mod config;
pub mod media;
pub mod model;
pub mod storage;
pub mod store;
pub mod views;

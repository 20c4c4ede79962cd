//! # Solvix server
//! This crate hosts the HTTP server for the Solvix storefront. It is responsible for:
//! * Account registration and login (bearer tokens).
//! * Placing orders, and letting admins move them through their lifecycle.
//! * Card checkouts through Stripe, and recording crypto payment claims.
//! * Receiving Stripe webhooks and applying the payment outcome to the order.
//! * Serving each user's notification inbox.
//!
//! The lifecycle rules themselves live in `solvix_engine`. This crate only translates HTTP to engine calls.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The storefront API. See [routes](routes/index.html).
//! * `/api/webhooks/stripe`: Stripe payment events. Requests must carry a valid `Stripe-Signature` header.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod outbox_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;

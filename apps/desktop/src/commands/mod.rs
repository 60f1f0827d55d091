//! # Commands Module
//!
//! Every operation a presentation layer may call.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── auth.rs       ◄─── login, logout, own password
//! ├── users.rs      ◄─── accounts
//! ├── roles.rs      ◄─── roles and permission sets
//! ├── catalog.rs    ◄─── warehouses, items, price list
//! ├── partners.rs   ◄─── suppliers and customers
//! ├── ledger.rs     ◄─── issue / receive / transfer
//! ├── invoices.rs   ◄─── sales and purchase invoices
//! ├── returns.rs    ◄─── sales and purchase returns
//! ├── audit.rs      ◄─── stock counts
//! ├── activity.rs   ◄─── activity log
//! ├── dashboard.rs  ◄─── counters and profit
//! ├── settings.rs   ◄─── settings.json
//! └── backup.rs     ◄─── backup and restore
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  create_item(&app, &session, &input)                                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  app.authorize(&session, Section::Items, Capability::Add)               │
//! │    (not live ──► SESSION_EXPIRED, not granted ──► PERMISSION_DENIED)    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  app.db.inner().items().create(&input, &actor.username)                 │
//! │    (validation + one transaction incl. activity log)                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  app.events.publish(DataChanged { items, created })                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Ok(Item)                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Read commands need the section's `view` capability. Nothing is written
//! and no event is published when the check fails.

pub mod activity;
pub mod audit;
pub mod auth;
pub mod backup;
pub mod catalog;
pub mod dashboard;
pub mod invoices;
pub mod ledger;
pub mod partners;
pub mod returns;
pub mod roles;
pub mod settings;
pub mod users;

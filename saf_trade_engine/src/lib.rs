//! SAF Trade Engine
//!
//! The engine behind the sustainable aviation fuel trading server. It owns the lot,
//! bid and contract lifecycles, organization memberships, one-time login codes, and
//! the durable webhook outbox.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the backend; the
//!    storage contract is expressed as traits in [`mod@traits`] so the APIs never
//!    depend on SQLite directly. The row types live in [`mod@db_types`] and are
//!    public.
//! 2. The engine public API ([`mod@api`]). Lot CRUD, the bid flow (including
//!    counter-offers and the atomic acceptance transaction), contracts, memberships
//!    and login codes.
//! 3. Events ([`mod@events`]). Post-commit hooks the server installs on the APIs,
//!    currently used to nudge the webhook drain worker the moment a notification is
//!    queued.
pub mod api;
pub mod db;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

pub use db::sqlite::SqliteDatabase;

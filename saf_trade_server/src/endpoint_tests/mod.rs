mod helpers;

mod auth;
mod bids;
mod lots;
mod orgs;

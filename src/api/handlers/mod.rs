mod inventory;
mod placement;
mod requests;
mod reservations;
mod settings;
mod sse;
mod status;

pub(super) use inventory::{get_inventory, replace_inventory};
pub(super) use placement::place_vm;
pub(super) use requests::get_request;
pub(super) use reservations::{list_reservations, open_reservation, release_reservation};
pub(super) use settings::{get_settings, update_settings};
pub(super) use sse::sse_events;
pub(super) use status::get_status;

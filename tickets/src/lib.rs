//! ElectionBet Tickets
//!
//! Lists the predictions an identity has placed and reveals them:
//! - `tickets_for`: filter a market's tickets down to one bettor
//! - `TicketDecryptionCache`: independent, memoized per-ticket decryption
//! - `TicketView`: display state per ticket (hidden, decrypting, failed,
//!   revealed)

pub mod cache;
pub mod view;

pub use cache::{CacheEntry, DecryptedTicket, DecryptionStatus, TicketDecryptionCache};
pub use view::{tickets_for, TicketDisplay, TicketView};

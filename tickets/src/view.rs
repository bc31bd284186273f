//! Per-ticket display state

use electionbet_fhe::Address;
use electionbet_ledger::{Ticket, TicketId, TicketStatus};
use serde::{Deserialize, Serialize};

use crate::cache::{DecryptionStatus, TicketDecryptionCache};

/// What to show in place of a ticket's encrypted fields
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TicketDisplay {
    /// Reveal is switched off
    Hidden,
    Decrypting,
    Failed { message: String },
    Revealed { candidate_index: u32, stake: String },
}

/// One row of the "my predictions" listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketView {
    pub ticket_id: TicketId,
    /// Abbreviated commitment hex
    pub commitment: String,
    pub status: TicketStatus,
    pub display: TicketDisplay,
}

/// Tickets submitted by `identity`, in ledger order
pub fn tickets_for(all: &[Ticket], identity: &Address) -> Vec<Ticket> {
    all.iter()
        .filter(|t| t.is_owned_by(identity))
        .cloned()
        .collect()
}

impl TicketDecryptionCache {
    /// Render `tickets` against the cache.
    ///
    /// A ticket with no entry yet shows as decrypting while revealing.
    pub fn views(&self, tickets: &[Ticket], reveal: bool) -> Vec<TicketView> {
        tickets
            .iter()
            .map(|ticket| {
                let display = if !reveal {
                    TicketDisplay::Hidden
                } else {
                    match self.entry(ticket.ticket_id).map(|e| e.status) {
                        None | Some(DecryptionStatus::Pending) => TicketDisplay::Decrypting,
                        Some(DecryptionStatus::Failed(e)) => TicketDisplay::Failed {
                            message: e.to_string(),
                        },
                        Some(DecryptionStatus::Ready(t)) => TicketDisplay::Revealed {
                            candidate_index: t.candidate_index,
                            stake: t.stake.to_string(),
                        },
                    }
                };
                TicketView {
                    ticket_id: ticket.ticket_id,
                    commitment: ticket.commitment.abbreviated(),
                    status: ticket.status(),
                    display,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use electionbet_commitment::{Commitment, MarketId};
    use electionbet_fhe::{AdapterCell, CiphertextHandle, InMemoryRelayer, RelayerConfig};
    use std::sync::Arc;

    fn ticket(id: TicketId, bettor: Address, byte: u8) -> Ticket {
        Ticket {
            ticket_id: id,
            market_id: MarketId(1),
            bettor,
            commitment: Commitment::from_bytes([byte; 32]),
            claimed: false,
            candidate_handle: CiphertextHandle::from_bytes([byte; 32]),
            stake_handle: CiphertextHandle::from_bytes([byte.wrapping_add(1); 32]),
        }
    }

    #[test]
    fn test_filter_by_bettor_ignores_hex_case() {
        let alice: Address = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".parse().unwrap();
        let bob = Address::from_bytes([0xB0; 20]);
        let all = vec![ticket(1, alice, 1), ticket(2, bob, 2), ticket(3, alice, 3)];

        let upper: Address = "0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD".parse().unwrap();
        let mine = tickets_for(&all, &upper);
        assert_eq!(mine.iter().map(|t| t.ticket_id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_views_before_and_after_reveal() {
        let relayer = Arc::new(InMemoryRelayer::new());
        let owner = Address::from_bytes([0xA1; 20]);
        let contract = Address::from_bytes([0xC0; 20]);
        let mut t = ticket(7, owner, 9);
        t.candidate_handle = relayer.seal(contract, owner, 1);
        t.stake_handle = relayer.seal(contract, owner, 2_500_000);
        t.claimed = true;

        let cache = TicketDecryptionCache::new(
            Arc::new(AdapterCell::ready(relayer, RelayerConfig::default())),
            owner,
            1_000_000,
        );
        let tickets = vec![t];

        let hidden = cache.views(&tickets, false);
        assert_eq!(hidden[0].display, TicketDisplay::Hidden);
        assert_eq!(hidden[0].status, TicketStatus::Claimed);
        assert_eq!(hidden[0].commitment, "0x090909...090909");

        // not yet synced
        assert_eq!(cache.views(&tickets, true)[0].display, TicketDisplay::Decrypting);

        cache.sync(&tickets, true);
        cache.wait_idle().await;
        assert_eq!(
            cache.views(&tickets, true)[0].display,
            TicketDisplay::Revealed {
                candidate_index: 1,
                stake: "2.5".to_string()
            }
        );
        assert_eq!(cache.views(&tickets, false)[0].display, TicketDisplay::Hidden);
    }

    #[test]
    fn test_display_serialization() {
        let json = serde_json::to_string(&TicketDisplay::Failed {
            message: "denied".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"failed","message":"denied"}"#);
    }
}

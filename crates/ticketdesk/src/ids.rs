//! Identifier generation for records created locally.

use rand::Rng;
use ticketdesk_model::{TicketId, UserId};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `u<base36 millis><4 random>`. Never contains `_`, so it can be embedded
/// in a session token.
pub(crate) fn new_user_id(now_millis: i64) -> UserId {
    UserId(format!(
        "u{}{}",
        to_base36(now_millis.max(0) as u64),
        random_base36(4)
    ))
}

/// `tkt_<millis>_<6 random base36>`.
pub(crate) fn new_ticket_id(now_millis: i64) -> TicketId {
    TicketId(format!("tkt_{now_millis}_{}", random_base36(6)))
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    digits.iter().rev().collect()
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

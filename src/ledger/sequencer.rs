use chrono::Utc;
use uuid::Uuid;

const ID_SUFFIX_LEN: usize = 8;

/// Issues request numbers and fresh request ids for one ledger.
///
/// # Invariants
/// - `next()` returns exactly one more than the previous call.
/// - The counter never goes down except through `restore`, which takes the
///   persisted value as the new truth.
/// - The millisecond component of `fresh_id()` never goes backwards, even if
///   the wall clock does.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    issued: u64,
    last_id_millis: i64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the counter as if `issued` numbers had already been handed out.
    pub fn starting_at(issued: u64) -> Self {
        Self {
            issued,
            last_id_millis: 0,
        }
    }

    pub fn next(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Number of request numbers issued so far (the last one handed out).
    pub fn current(&self) -> u64 {
        self.issued
    }

    pub fn fresh_id(&mut self) -> String {
        let millis = Utc::now().timestamp_millis().max(self.last_id_millis);
        self.last_id_millis = millis;

        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", to_base36(millis.unsigned_abs()), &suffix[..ID_SUFFIX_LEN])
    }

    pub(crate) fn restore(&mut self, issued: u64) {
        self.issued = issued;
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use rand::Rng;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

static PROCESS_BYTES: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

pub fn new_object_id() -> String {
    let seconds = Utc::now().timestamp() as u32;

    let process = PROCESS_BYTES.get_or_init(|| {
        let mut bytes = [0_u8; 5];
        rand::thread_rng().fill(&mut bytes);
        bytes
    });

    let counter = COUNTER
        .get_or_init(|| AtomicU32::new(rand::thread_rng().gen_range(0..=COUNTER_MASK / 2)))
        .fetch_add(1, Ordering::Relaxed)
        & COUNTER_MASK;

    let process_hex = process
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>();

    format!("{seconds:08x}{process_hex}{counter:06x}")
}

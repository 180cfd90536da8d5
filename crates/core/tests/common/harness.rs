use humsim_core::common::{AddressRange, PortId, Tick};
use humsim_core::config::{Config, PolicyConfig, PolicyKind, TierConfig};
use humsim_core::stats::CounterSnapshot;
use humsim_core::{HumController, Request, RequestId, Response, SimContext};

/// Block size used by the small configuration.
pub const BLOCK: u64 = 64;

/// Far region of the small configuration: 64 blocks at address 0.
pub const FAR: AddressRange = AddressRange::new(0, 4096);

/// Near region of the small configuration: 16 blocks directly after `FAR`.
pub const NEAR: AddressRange = AddressRange::new(4096, 5120);

/// Hot threshold of the small configuration.
pub const HOT: u32 = 3;

/// Aging interval of the small configuration.
pub const AGING: Tick = 1_000_000;

/// A compact two-tier configuration with short, distinct latencies.
///
/// | tier | read | write | ticks/byte |
/// |------|------|-------|------------|
/// | near | 10   | 12    | 1          |
/// | far  | 100  | 300   | 2          |
pub fn small_config() -> Config {
    Config {
        near: TierConfig {
            range: NEAR,
            read_latency: 10,
            write_latency: 12,
            ticks_per_byte: 1,
        },
        far: TierConfig {
            range: FAR,
            read_latency: 100,
            write_latency: 300,
            ticks_per_byte: 2,
        },
        backup: None,
        block_size: BLOCK,
        ports: 3,
        policy: PolicyConfig {
            kind: PolicyKind::HotCold,
            hot_threshold: HOT,
            cold_threshold: 1,
            max_hotness: 15,
            aging_interval: AGING,
            near_capacity_blocks: 4,
        },
    }
}

/// `small_config` with `capacity` near slots.
pub fn with_capacity(capacity: usize) -> Config {
    let mut config = small_config();
    config.policy.near_capacity_blocks = capacity;
    config
}

/// `small_config` plus a backup tier at `[5120, 6144)`.
pub fn with_backup() -> Config {
    let mut config = small_config();
    config.backup = Some(TierConfig {
        range: AddressRange::new(5120, 6144),
        read_latency: 200,
        write_latency: 400,
        ticks_per_byte: 4,
    });
    config
}

/// Deterministic, non-repeating test data.
pub fn pattern(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| seed.wrapping_mul(31).wrapping_add(i as u8))
        .collect()
}

/// Installs a test-friendly tracing subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// A controller plus every response it has produced.
pub struct Harness {
    pub hum: HumController,
    pub responses: Vec<Response>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(small_config())
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        Self {
            hum: HumController::new(config).unwrap(),
            responses: Vec::new(),
        }
    }

    pub fn read(&mut self, now: Tick, addr: u64, size: u64) -> RequestId {
        self.hum
            .submit(&SimContext::at(now), Request::read(PortId(1), addr, size))
            .unwrap()
    }

    pub fn write(&mut self, now: Tick, addr: u64, data: &[u8]) -> RequestId {
        self.hum
            .submit(
                &SimContext::at(now),
                Request::write(PortId(1), addr, data.to_vec()),
            )
            .unwrap()
    }

    pub fn advance(&mut self, now: Tick) -> Vec<Response> {
        let out = self.hum.advance(&SimContext::at(now)).unwrap();
        self.responses.extend(out.iter().cloned());
        out
    }

    pub fn drain(&mut self) -> Vec<Response> {
        let out = self.hum.drain().unwrap();
        self.responses.extend(out.iter().cloned());
        out
    }

    pub fn response(&self, id: RequestId) -> &Response {
        self.responses
            .iter()
            .find(|r| r.id == id)
            .unwrap_or_else(|| panic!("no response for {id}"))
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.hum.counters()
    }

    /// Makes the block at `addr` hot with `HOT` reads ten ticks apart and
    /// lets the resulting migration finish.
    pub fn heat(&mut self, start: Tick, addr: u64) {
        for i in 0..u64::from(HOT) {
            let _ = self.read(start + i * 10, addr, 8);
        }
        let _ = self.drain();
    }

    pub fn peek(&self, addr: u64, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.hum.functional_read(addr, &mut buf).unwrap();
        buf
    }
}

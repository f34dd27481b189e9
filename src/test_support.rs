//! In-process fakes for the device boundaries

use crate::error::{Error, Result};
use crate::live_view::decoder::{self, PAYLOAD_TYPE_JPEG};
use crate::live_view::{LiveStream, StreamSource};
use crate::rpc_channel::{RpcChannel, RpcSlots};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone)]
enum Reply {
    Slots(Vec<Value>),
    Fail(i64, String),
}

impl Reply {
    fn into_result(self) -> Result<RpcSlots> {
        match self {
            Reply::Slots(slots) => Ok(RpcSlots::new(slots)),
            Reply::Fail(code, message) => Err(Error::Rpc { code, message }),
        }
    }
}

#[derive(Default)]
struct FakeRpcState {
    calls: Vec<(String, Vec<Value>)>,
    call_times: Vec<(String, Instant)>,
    queued: HashMap<String, VecDeque<Reply>>,
    sticky: HashMap<String, Reply>,
    delays: HashMap<String, Duration>,
}

/// Scripted `RpcChannel`
///
/// Queued replies are consumed first, then the sticky reply for the method,
/// then `[0]`.
#[derive(Default)]
pub struct FakeRpc {
    state: Mutex<FakeRpcState>,
}

impl FakeRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: &str, slots: Vec<Value>) {
        self.lock().sticky.insert(method.to_string(), Reply::Slots(slots));
    }

    pub fn respond_once(&self, method: &str, slots: Vec<Value>) {
        self.lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(Reply::Slots(slots));
    }

    pub fn fail(&self, method: &str, code: i64, message: &str) {
        self.lock()
            .sticky
            .insert(method.to_string(), Reply::Fail(code, message.to_string()));
    }

    pub fn fail_once(&self, method: &str, code: i64, message: &str) {
        self.lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(Reply::Fail(code, message.to_string()));
    }

    /// Hold every call to `method` for `delay` before replying
    pub fn delay(&self, method: &str, delay: Duration) {
        self.lock().delays.insert(method.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|(m, _)| m == method).count()
    }

    /// Start times of every call to `method`
    pub fn call_times(&self, method: &str) -> Vec<Instant> {
        self.lock()
            .call_times
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, t)| *t)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeRpcState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl RpcChannel for FakeRpc {
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<RpcSlots> {
        let (reply, delay) = {
            let mut state = self.lock();
            state.calls.push((method.to_string(), params));
            state.call_times.push((method.to_string(), Instant::now()));

            let queued = state.queued.get_mut(method).and_then(VecDeque::pop_front);
            let reply = queued
                .or_else(|| state.sticky.get(method).cloned())
                .unwrap_or_else(|| Reply::Slots(vec![json!(0)]));
            (reply, state.delays.get(method).copied())
        };

        if let Some(delay) = delay {
            sleep(delay).await;
        }

        reply.into_result()
    }
}

#[derive(Debug, Clone, Copy)]
enum ScriptEnd {
    /// Keep the connection open without sending anything
    Stall,
    /// Close the connection
    Close,
}

/// Behaviour of one live-view connection
#[derive(Debug, Clone, Copy)]
pub struct StreamScript {
    frames: Option<u16>,
    period: Duration,
    end: ScriptEnd,
}

impl StreamScript {
    pub fn endless(period: Duration) -> Self {
        Self {
            frames: None,
            period,
            end: ScriptEnd::Stall,
        }
    }

    pub fn stall_after(frames: u16, period: Duration) -> Self {
        Self {
            frames: Some(frames),
            period,
            end: ScriptEnd::Stall,
        }
    }

    pub fn close_after(frames: u16, period: Duration) -> Self {
        Self {
            frames: Some(frames),
            period,
            end: ScriptEnd::Close,
        }
    }
}

/// `StreamSource` serving one script per open; the last one repeats
pub struct ScriptedStreamSource {
    scripts: Mutex<VecDeque<StreamScript>>,
    opens: AtomicUsize,
}

impl ScriptedStreamSource {
    pub fn new(scripts: Vec<StreamScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn next_script(&self) -> Option<StreamScript> {
        let mut scripts = self.scripts.lock().unwrap();
        if scripts.len() > 1 {
            scripts.pop_front()
        } else {
            scripts.front().copied()
        }
    }
}

#[async_trait]
impl StreamSource for ScriptedStreamSource {
    async fn open(&self, _url: &str) -> Result<LiveStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let script = self
            .next_script()
            .ok_or_else(|| Error::Network("no stream scripted".to_string()))?;

        let (reader, mut writer) = tokio::io::duplex(64 * 1024);

        tokio::spawn(async move {
            let mut sequence: u16 = 0;
            loop {
                if script.frames.is_some_and(|n| sequence >= n) {
                    break;
                }

                sleep(script.period).await;
                let packet = encode_packet(PAYLOAD_TYPE_JPEG, sequence, &[0xFF, 0xD8, 0xFF, 0xD9], 4);
                if writer.write_all(&packet).await.is_err() {
                    return;
                }
                sequence = sequence.wrapping_add(1);
            }

            match script.end {
                ScriptEnd::Stall => std::future::pending::<()>().await,
                ScriptEnd::Close => drop(writer),
            }
        });

        Ok(Box::new(reader))
    }
}

/// One packet in the live-view wire format
pub fn encode_packet(payload_type: u8, sequence: u16, payload: &[u8], padding: u8) -> Vec<u8> {
    let mut packet = vec![0u8; decoder::HEADER_LEN];
    packet[0] = 0xFF;
    packet[1] = payload_type;
    packet[2..4].copy_from_slice(&sequence.to_be_bytes());

    let size = payload.len();
    let size_at = decoder::COMMON_HEADER_LEN + 4;
    packet[decoder::COMMON_HEADER_LEN..size_at].copy_from_slice(&[0x24, 0x35, 0x68, 0x79]);
    packet[size_at] = (size >> 16) as u8;
    packet[size_at + 1] = (size >> 8) as u8;
    packet[size_at + 2] = size as u8;
    packet[size_at + 3] = padding;

    packet.extend_from_slice(payload);
    packet.extend(std::iter::repeat(0u8).take(usize::from(padding)));
    packet
}

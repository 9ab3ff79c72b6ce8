//! In-process media stack that records construct/dispose order.

use std::cell::RefCell;
use std::rc::Rc;

use super::{CaptionSlot, Dispose, MediaStack, Skin, SkinOptions};
use crate::error::PlayerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AttachDecoder(usize),
    AttachSkin(usize),
    DisposeSkin(usize),
    DisposeDecoder(usize),
    ShowEmbed(String),
}

#[derive(Default)]
struct Ledger {
    calls: Vec<Call>,
    decoders: usize,
    skins: usize,
    live_decoders: usize,
    live_skins: usize,
}

#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Ledger>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().calls.clone()
    }

    pub fn live_decoders(&self) -> usize {
        self.0.borrow().live_decoders
    }

    pub fn live_skins(&self) -> usize {
        self.0.borrow().live_skins
    }

    pub fn embeds(&self) -> Vec<String> {
        self.0
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::ShowEmbed(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Default)]
pub struct RecordingStack {
    log: CallLog,
    fail_skin: bool,
}

impl RecordingStack {
    pub fn failing_skin() -> Self {
        Self {
            fail_skin: true,
            ..Self::default()
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

pub struct FakeDecoder {
    id: usize,
    live: bool,
    log: CallLog,
}

impl Dispose for FakeDecoder {
    fn dispose(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        let mut ledger = self.log.0.borrow_mut();
        ledger.live_decoders -= 1;
        ledger.calls.push(Call::DisposeDecoder(self.id));
    }
}

pub struct FakeSkin {
    id: usize,
    live: bool,
    log: CallLog,
}

impl Dispose for FakeSkin {
    fn dispose(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        let mut ledger = self.log.0.borrow_mut();
        ledger.live_skins -= 1;
        ledger.calls.push(Call::DisposeSkin(self.id));
    }
}

impl Skin for FakeSkin {
    async fn wait(&mut self) -> Result<(), PlayerError> {
        Ok(())
    }
}

impl MediaStack for RecordingStack {
    type Decoder = FakeDecoder;
    type Skin = FakeSkin;

    async fn attach_decoder(&mut self, manifest: &str) -> Result<FakeDecoder, PlayerError> {
        if manifest.contains("broken") {
            return Err(PlayerError::ManifestFetch {
                url: manifest.to_string(),
                reason: String::from("HTTP 404 Not Found"),
            });
        }
        let mut ledger = self.log.0.borrow_mut();
        assert_eq!(ledger.live_skins, 0, "decoder attached under a live skin");
        assert_eq!(ledger.live_decoders, 0, "decoder attached over a live decoder");
        ledger.decoders += 1;
        ledger.live_decoders += 1;
        let id = ledger.decoders;
        ledger.calls.push(Call::AttachDecoder(id));
        Ok(FakeDecoder {
            id,
            live: true,
            log: self.log.clone(),
        })
    }

    fn attach_skin(
        &mut self,
        decoder: &FakeDecoder,
        _options: &SkinOptions,
        _captions: &[CaptionSlot],
    ) -> Result<FakeSkin, PlayerError> {
        assert!(decoder.live, "skin attached to a disposed decoder");
        if self.fail_skin {
            return Err(PlayerError::EmptyCommand);
        }
        let mut ledger = self.log.0.borrow_mut();
        assert_eq!(ledger.live_skins, 0, "skin attached over a live skin");
        ledger.skins += 1;
        ledger.live_skins += 1;
        let id = ledger.skins;
        ledger.calls.push(Call::AttachSkin(id));
        Ok(FakeSkin {
            id,
            live: true,
            log: self.log.clone(),
        })
    }

    fn show_embed(&mut self, url: &str) -> Result<(), PlayerError> {
        self.log
            .0
            .borrow_mut()
            .calls
            .push(Call::ShowEmbed(url.to_string()));
        Ok(())
    }
}

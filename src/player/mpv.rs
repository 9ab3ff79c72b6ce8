use reqwest::Client;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::{CaptionSlot, Control, Dispose, MediaStack, Skin, SkinOptions, TrackMode};
use crate::config::{PLAYER_ENV_KEY, Settings};
use crate::error::PlayerError;
use crate::hls::{self, ResolvedStream};

/// mpv as the skin, `m3u8-rs` resolution as the decoder, and the system
/// browser as the embed surface.
pub struct MpvStack {
    http: Client,
    program: String,
    base_args: Vec<String>,
    media_title: String,
    open_embeds: bool,
    opened_embed: Option<String>,
}

impl MpvStack {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let (program, base_args) = settings
            .player_command()
            .ok_or(PlayerError::EmptyCommand)?;
        let http = Client::builder().user_agent(&settings.user_agent).build()?;
        Ok(Self {
            http,
            program,
            base_args,
            media_title: String::from("anwatch"),
            open_embeds: settings.open_embeds,
            opened_embed: None,
        })
    }
}

pub struct HlsDecoder {
    stream: Option<ResolvedStream>,
}

impl HlsDecoder {
    pub fn stream_url(&self) -> Option<&str> {
        self.stream.as_ref().map(|stream| stream.stream_url.as_str())
    }

    /// Subtitle renditions the master playlist declares. mpv lists these
    /// before any `--sub-file` track.
    pub fn embedded_subtitles(&self) -> usize {
        self.stream
            .as_ref()
            .map_or(0, |stream| stream.subtitle_renditions)
    }
}

impl Dispose for HlsDecoder {
    fn dispose(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!(manifest = %stream.manifest_url, "decoder detached");
        }
    }
}

pub struct MpvSkin {
    program: String,
    child: Option<Child>,
}

impl Dispose for MpvSkin {
    fn dispose(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.start_kill() {
                debug!(error = %err, "player already gone");
            }
        }
    }
}

impl Skin for MpvSkin {
    async fn wait(&mut self) -> Result<(), PlayerError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        let status = child.wait().await.map_err(|source| PlayerError::Launch {
            program: self.program.clone(),
            source,
        })?;
        self.child = None;
        if !status.success() {
            return Err(PlayerError::Exit(status));
        }
        Ok(())
    }
}

impl MediaStack for MpvStack {
    type Decoder = HlsDecoder;
    type Skin = MpvSkin;

    async fn attach_decoder(&mut self, manifest: &str) -> Result<HlsDecoder, PlayerError> {
        let stream = hls::fetch_and_resolve(&self.http, manifest).await?;
        Ok(HlsDecoder {
            stream: Some(stream),
        })
    }

    fn attach_skin(
        &mut self,
        decoder: &HlsDecoder,
        options: &SkinOptions,
        captions: &[CaptionSlot],
    ) -> Result<MpvSkin, PlayerError> {
        let Some(stream_url) = decoder.stream_url() else {
            return Err(PlayerError::EmptyCommand);
        };
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args);
        cmd.args(skin_args(
            &self.media_title,
            options,
            captions,
            decoder.embedded_subtitles(),
        ));
        cmd.arg(stream_url);
        cmd.kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlayerError::PlayerNotFound {
                    program: self.program.clone(),
                    env: PLAYER_ENV_KEY,
                });
            }
            Err(source) => {
                return Err(PlayerError::Launch {
                    program: self.program.clone(),
                    source,
                });
            }
        };
        let controls: Vec<&str> = options.controls.iter().map(|c| c.as_str()).collect();
        info!(program = %self.program, stream = stream_url, ?controls, "player started");
        Ok(MpvSkin {
            program: self.program.clone(),
            child: Some(child),
        })
    }

    fn show_embed(&mut self, url: &str) -> Result<(), PlayerError> {
        if self.opened_embed.as_deref() == Some(url) {
            return Ok(());
        }
        self.opened_embed = Some(url.to_string());
        if !self.open_embeds {
            println!("Embed: {url}");
            return Ok(());
        }
        println!("Opening embed {url}");
        open::that_detached(url).map_err(|source| {
            warn!(url, error = %source, "could not open browser");
            PlayerError::Embed {
                url: url.to_string(),
                source,
            }
        })
    }

    fn set_title(&mut self, title: &str) {
        self.media_title = title.to_string();
    }
}

/// mpv arguments for the skin options and prepared caption tracks.
///
/// `embedded_subtitles` is the number of subtitle tracks mpv finds in the
/// stream itself; external tracks are numbered after them.
pub fn skin_args(
    title: &str,
    options: &SkinOptions,
    captions: &[CaptionSlot],
    embedded_subtitles: usize,
) -> Vec<String> {
    let mut args = vec![
        String::from("--quiet"),
        String::from("--terminal=no"),
        format!("--force-media-title={title}"),
    ];
    let has = |control: Control| options.controls.contains(&control);
    args.push(String::from(if options.controls.is_empty() {
        "--osc=no"
    } else {
        "--osc=yes"
    }));

    let captions_allowed = has(Control::Captions);
    if captions_allowed && options.captions_update {
        args.push(String::from("--sub-auto=fuzzy"));
    }
    for slot in captions {
        args.push(format!("--sub-file={}", slot.file));
    }
    let showing = captions
        .iter()
        .position(|slot| slot.mode == TrackMode::Showing)
        .filter(|_| captions_allowed && options.captions_active);
    match showing {
        // Captions muxed into segments without a playlist rendition are not
        // counted and shift this id.
        Some(index) => args.push(format!("--sid={}", embedded_subtitles + index + 1)),
        None => args.push(String::from("--sid=no")),
    }
    if let Some(index) = showing {
        args.push(format!("--slang={}", captions[index].srclang));
        args.push(String::from("--sub-visibility=yes"));
        debug!(label = %captions[index].label, lang = %captions[index].srclang, "caption track enabled");
    }
    args
}

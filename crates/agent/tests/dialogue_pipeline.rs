//! End-to-end dispatcher tests with mock collaborators
//!
//! Transport, completion service and both speech engines are replaced by
//! scripted doubles. Humanizing delays are zero unless a test asks for the
//! configured ones, which then run on a paused clock.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

use chat_agent_agent::{AgentContext, AiClient, DialogueState, Orchestrator};
use chat_agent_config::{HumanizeConfig, Settings, TriggerDefinition, TriggerSet};
use chat_agent_core::{
    CallEvent, CallStatus, Error, InboundEnvelope, InboundEvent, Language, MessageTransport,
    OutboundPayload, OutgoingResponse, PresenceState, Result, SpeechToText, TextToSpeech,
    TurnRole,
};
use chat_agent_llm::{FinishReason, GenerationResult, LlmBackend, LlmError, Message};
use chat_agent_persistence::{HistoryRepository, InMemoryHistoryStore, JsonFileHistoryStore};
use chat_agent_pipeline::AudioPipeline;

const CONTACT: &str = "5511999990000@s.whatsapp.net";

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(String, OutboundPayload)>>,
    presence: Mutex<Vec<PresenceState>>,
    rejected: Mutex<Vec<String>>,
    /// Clock readings of every presence update and send
    timeline: Mutex<Vec<(Instant, Stamp)>>,
    media: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stamp {
    Presence(PresenceState),
    Sent,
}

impl RecordingTransport {
    fn with_media(bytes: &[u8]) -> Self {
        Self {
            media: Some(bytes.to_vec()),
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<(String, OutboundPayload)> {
        self.sent.lock().clone()
    }

    fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|(_, payload)| match payload {
                OutboundPayload::Text { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn presence(&self) -> Vec<PresenceState> {
        self.presence.lock().clone()
    }

    /// When `stamp` first happened
    fn stamped(&self, stamp: Stamp) -> Instant {
        self.timeline
            .lock()
            .iter()
            .find(|(_, s)| *s == stamp)
            .map(|(at, _)| *at)
            .unwrap_or_else(|| panic!("{:?} never happened", stamp))
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send_message(&self, contact: &str, payload: OutboundPayload) -> Result<()> {
        self.timeline.lock().push((Instant::now(), Stamp::Sent));
        self.sent.lock().push((contact.to_string(), payload));
        Ok(())
    }

    async fn send_presence_update(&self, state: PresenceState, _contact: &str) -> Result<()> {
        self.timeline.lock().push((Instant::now(), Stamp::Presence(state)));
        self.presence.lock().push(state);
        Ok(())
    }

    async fn reject_call(&self, call_id: &str, _from: &str) -> Result<()> {
        self.rejected.lock().push(call_id.to_string());
        Ok(())
    }

    async fn download_media(&self, _event: &InboundEvent) -> Result<Vec<u8>> {
        self.media
            .clone()
            .ok_or_else(|| Error::Media("media expired".to_string()))
    }
}

struct ScriptedLlm {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn generate(&self, _messages: &[Message]) -> std::result::Result<GenerationResult, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(text) => Ok(GenerationResult {
                text: text.clone(),
                tokens: 8,
                total_time_ms: 5,
                finish_reason: FinishReason::Stop,
            }),
            None => Err(LlmError::Api("HTTP 503".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedStt {
    transcript: Option<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(&self, _audio_path: &Path) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.transcript.clone())
    }

    fn model_name(&self) -> &str {
        "scripted-stt"
    }
}

struct ScriptedTts {
    output_dir: Option<PathBuf>,
    languages: Mutex<Vec<Language>>,
}

#[async_trait]
impl TextToSpeech for ScriptedTts {
    async fn synthesize(&self, _text: &str, language: Language) -> Result<Option<PathBuf>> {
        self.languages.lock().push(language);
        let Some(dir) = &self.output_dir else {
            return Err(Error::Tts("voice unavailable".to_string()));
        };
        let path = dir.join("resposta_1.mp3");
        std::fs::write(&path, b"ID3 fake mp3")?;
        Ok(Some(path))
    }

    fn voice(&self) -> &str {
        "pt-BR-ThalitaMultilingualNeural"
    }
}

struct Harness {
    orchestrator: Orchestrator,
    transport: Arc<RecordingTransport>,
    llm: Arc<ScriptedLlm>,
    stt: Arc<ScriptedStt>,
    tts: Arc<ScriptedTts>,
    store: Arc<dyn HistoryRepository>,
    dir: TempDir,
}

struct HarnessBuilder {
    transport: RecordingTransport,
    llm: ScriptedLlm,
    credential: bool,
    transcript: Option<String>,
    tts_works: bool,
    settings: Settings,
    durable: bool,
    humanized: bool,
}

impl HarnessBuilder {
    fn new() -> Self {
        Self {
            transport: RecordingTransport::default(),
            llm: ScriptedLlm::replying("Oi amor, estou aqui com voce."),
            credential: true,
            transcript: None,
            tts_works: true,
            settings: Settings::default(),
            durable: false,
            humanized: false,
        }
    }

    fn transport(mut self, transport: RecordingTransport) -> Self {
        self.transport = transport;
        self
    }

    fn llm(mut self, llm: ScriptedLlm) -> Self {
        self.llm = llm;
        self
    }

    fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    fn transcript(mut self, text: Option<&str>) -> Self {
        self.transcript = text.map(str::to_string);
        self
    }

    fn tts_works(mut self, works: bool) -> Self {
        self.tts_works = works;
        self
    }

    fn allow_group(mut self, group: &str) -> Self {
        self.settings.bot.allowed_groups.push(group.to_string());
        self
    }

    fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Keep the configured humanizing delays
    fn humanized(mut self) -> Self {
        self.humanized = true;
        self
    }

    fn build(self) -> Harness {
        let dir = TempDir::new().unwrap();
        let files_dir = dir.path().join("arquivos");
        let downloads_dir = dir.path().join("downloads");
        std::fs::create_dir_all(&files_dir).unwrap();
        std::fs::create_dir_all(&downloads_dir).unwrap();
        std::fs::write(files_dir.join("checklist.pdf"), b"%PDF-1.4 checklist").unwrap();
        std::fs::write(files_dir.join("guia.pdf"), b"%PDF-1.4 guia").unwrap();

        let mut settings = self.settings;
        if !self.humanized {
            settings.humanize = HumanizeConfig::immediate();
        }
        settings.paths.files_dir = files_dir;
        settings.paths.downloads_dir = downloads_dir.clone();
        settings.paths.history_file = dir.path().join("historico_conversas.json");

        let triggers = Arc::new(TriggerSet::new(vec![
            TriggerDefinition::new(
                "checklist",
                true,
                vec!["checklist.pdf".to_string(), "nao_existe.pdf".to_string()],
            ),
            TriggerDefinition::new("guia", false, vec!["guia.pdf".to_string()]),
        ]));

        let transport = Arc::new(self.transport);
        let llm = Arc::new(self.llm);
        let backend = self
            .credential
            .then(|| llm.clone() as Arc<dyn LlmBackend>);
        let stt = Arc::new(ScriptedStt {
            transcript: self.transcript,
            calls: AtomicUsize::new(0),
        });
        let tts = Arc::new(ScriptedTts {
            output_dir: self.tts_works.then(|| downloads_dir.clone()),
            languages: Mutex::new(Vec::new()),
        });

        let store: Arc<dyn HistoryRepository> = if self.durable {
            Arc::new(JsonFileHistoryStore::new(&settings.paths.history_file))
        } else {
            Arc::new(InMemoryHistoryStore::new())
        };

        let audio = AudioPipeline::from_settings(&settings, transport.clone(), stt.clone(), tts.clone());
        let ai = AiClient::new(
            backend,
            store.clone(),
            "Voce e Alma, uma coach emocional.",
            Duration::from_secs(5),
        );
        let ctx = AgentContext::new(&settings, triggers, transport.clone(), audio, ai);

        Harness {
            orchestrator: Orchestrator::new(ctx),
            transport,
            llm,
            stt,
            tts,
            store,
            dir,
        }
    }
}

fn messages() -> chat_agent_config::MessagesConfig {
    Settings::default().messages
}

#[tokio::test]
async fn test_exact_trigger_delivers_existing_files_only() {
    let h = HarnessBuilder::new().build();

    let dispatch = h
        .orchestrator
        .process(&InboundEvent::text("m1", CONTACT, "CHECKLIST"))
        .await;

    assert_eq!(
        dispatch.response,
        Some(OutgoingResponse::FileDelivery {
            files: vec!["checklist.pdf".to_string()]
        })
    );
    assert_eq!(
        dispatch.path,
        vec![
            DialogueState::Received,
            DialogueState::Filtered,
            DialogueState::Normalized,
            DialogueState::TriggerChecked,
            DialogueState::DeliveringFiles,
            DialogueState::Done,
        ]
    );

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0].1 {
        OutboundPayload::Document {
            bytes,
            file_name,
            mime_type,
        } => {
            assert_eq!(bytes.as_slice(), b"%PDF-1.4 checklist");
            assert_eq!(file_name, "checklist.pdf");
            assert_eq!(mime_type, "application/pdf");
        }
        other => panic!("expected a document, got {:?}", other),
    }

    // no AI, no presence, no history
    assert_eq!(h.llm.calls(), 0);
    assert!(h.transport.presence().is_empty());
    assert!(h.store.history(CONTACT).await.is_empty());
}

#[tokio::test]
async fn test_request_word_fires_trigger() {
    let h = HarnessBuilder::new().build();
    let response = h
        .orchestrator
        .handle(&InboundEvent::text("m1", CONTACT, "quero o checklist por favor"))
        .await;
    assert!(matches!(response, Some(OutgoingResponse::FileDelivery { .. })));
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_comment_goes_to_ai_with_text_reply() {
    let h = HarnessBuilder::new().build();

    let dispatch = h
        .orchestrator
        .process(&InboundEvent::text("m1", CONTACT, "ja li o checklist, obrigada"))
        .await;

    assert_eq!(
        dispatch.response,
        Some(OutgoingResponse::TextReply {
            text: "Oi amor, estou aqui com voce.".to_string()
        })
    );
    assert_eq!(dispatch.final_state(), DialogueState::Done);
    assert!(dispatch.path.contains(&DialogueState::RespondingText));

    assert_eq!(h.llm.calls(), 1);
    assert_eq!(
        h.transport.presence(),
        vec![PresenceState::Composing, PresenceState::Paused]
    );
    assert_eq!(h.transport.texts(), vec!["Oi amor, estou aqui com voce."]);

    let history = h.store.history(CONTACT).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, TurnRole::User);
    assert_eq!(history[0].content, "ja li o checklist, obrigada");
    assert_eq!(history[1].role, TurnRole::Assistant);
}

#[tokio::test]
async fn test_inactive_trigger_is_skipped() {
    let h = HarnessBuilder::new().build();
    let response = h
        .orchestrator
        .handle(&InboundEvent::text("m1", CONTACT, "guia"))
        .await;
    assert!(matches!(response, Some(OutgoingResponse::TextReply { .. })));
    assert_eq!(h.llm.calls(), 1);
}

#[tokio::test]
async fn test_ai_failure_sends_apology_and_keeps_history() {
    let h = HarnessBuilder::new()
        .llm(ScriptedLlm::failing())
        .build();
    h.store.append_turn(CONTACT, TurnRole::User, "antes").await;
    let before = h.store.history(CONTACT).await;

    let dispatch = h
        .orchestrator
        .process(&InboundEvent::text("m1", CONTACT, "oi, tudo bem?"))
        .await;

    assert_eq!(
        dispatch.response,
        Some(OutgoingResponse::ApologyText {
            text: messages().ai_failure
        })
    );
    assert_eq!(
        &dispatch.path[dispatch.path.len() - 2..],
        &[DialogueState::ConsultingAi, DialogueState::Done]
    );
    assert_eq!(h.llm.calls(), 1);
    assert_eq!(
        h.transport.presence(),
        vec![PresenceState::Composing, PresenceState::Paused]
    );
    assert_eq!(h.transport.texts(), vec![messages().ai_failure]);
    assert_eq!(h.store.history(CONTACT).await, before);
}

#[tokio::test]
async fn test_missing_credential_never_calls_backend() {
    let h = HarnessBuilder::new().without_credential().build();
    let response = h
        .orchestrator
        .handle(&InboundEvent::text("m1", CONTACT, "oi"))
        .await;

    assert_eq!(
        response,
        Some(OutgoingResponse::ApologyText {
            text: messages().ai_failure
        })
    );
    assert!(h.store.history(CONTACT).await.is_empty());
}

#[tokio::test]
async fn test_group_not_allow_listed_is_dropped_early() {
    let h = HarnessBuilder::new()
        .transport(RecordingTransport::with_media(b"OggS"))
        .transcript(Some("checklist"))
        .build();

    for event in [
        InboundEvent::text("m1", "120363000001@g.us", "CHECKLIST"),
        InboundEvent::text("m2", "120363000001@g.us", "oi"),
        InboundEvent::audio("m3", "120363000001@g.us"),
    ] {
        let dispatch = h.orchestrator.process(&event).await;
        assert!(dispatch.response.is_none());
        assert_eq!(
            dispatch.path,
            vec![DialogueState::Received, DialogueState::Done]
        );
    }

    assert!(h.transport.sent().is_empty());
    assert!(h.transport.presence().is_empty());
    assert_eq!(h.llm.calls(), 0);
    assert_eq!(h.stt.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_allow_listed_group_is_processed() {
    let group = "120363000002@g.us";
    let h = HarnessBuilder::new().allow_group(group).build();

    let response = h
        .orchestrator
        .handle(&InboundEvent::text("m1", group, "oi pessoal"))
        .await;
    assert!(matches!(response, Some(OutgoingResponse::TextReply { .. })));
    assert_eq!(h.transport.sent()[0].0, group);
}

#[tokio::test]
async fn test_ignored_senders_and_contents() {
    let h = HarnessBuilder::new().build();

    let mut own = InboundEvent::text("m1", CONTACT, "CHECKLIST");
    own.from_me = true;

    let broadcast = InboundEvent::text("m2", "status@broadcast", "CHECKLIST");

    let mut empty = InboundEvent::text("m3", CONTACT, "");
    empty.envelope = None;

    let mut sticker = InboundEvent::text("m4", CONTACT, "");
    sticker.envelope = Some(InboundEnvelope::Unsupported);

    let blank = InboundEvent::text("m5", CONTACT, "   ");

    for event in [own, broadcast, empty, sticker, blank] {
        assert!(h.orchestrator.handle(&event).await.is_none(), "{:?}", event.id);
    }

    assert!(h.transport.sent().is_empty());
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_voice_note_round_trip() {
    let h = HarnessBuilder::new()
        .transport(RecordingTransport::with_media(b"OggS voice"))
        .transcript(Some("oi, estou precisando conversar"))
        .build();

    let dispatch = h
        .orchestrator
        .process(&InboundEvent::audio("m1", CONTACT))
        .await;

    let Some(OutgoingResponse::AudioReply {
        audio_path,
        language,
    }) = dispatch.response.clone()
    else {
        panic!("expected an audio reply, got {:?}", dispatch.response);
    };
    assert_eq!(language, Language::Portuguese);
    assert!(!audio_path.exists(), "artifact should be deleted after sending");
    assert!(dispatch.path.contains(&DialogueState::RespondingAudio));

    assert_eq!(
        h.transport.presence(),
        vec![
            PresenceState::Composing,
            PresenceState::Recording,
            PresenceState::Paused
        ]
    );

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0].1 {
        OutboundPayload::Audio {
            bytes,
            mime_type,
            voice_note,
        } => {
            assert_eq!(bytes.as_slice(), b"ID3 fake mp3");
            assert_eq!(mime_type, "audio/mp4");
            assert!(voice_note);
        }
        other => panic!("expected a voice note, got {:?}", other),
    }

    // the transcript is what gets stored
    let history = h.store.history(CONTACT).await;
    assert_eq!(history[0].content, "oi, estou precisando conversar");
    assert_eq!(h.tts.languages.lock().as_slice(), &[Language::Portuguese]);
}

#[tokio::test]
async fn test_voice_note_falls_back_to_text_when_synthesis_fails() {
    let h = HarnessBuilder::new()
        .transport(RecordingTransport::with_media(b"OggS voice"))
        .transcript(Some("hello, how are you"))
        .llm(ScriptedLlm::replying("Hello! How are you feeling today?"))
        .tts_works(false)
        .build();

    let response = h
        .orchestrator
        .handle(&InboundEvent::audio("m1", CONTACT))
        .await;

    assert_eq!(
        response,
        Some(OutgoingResponse::TextReply {
            text: "Hello! How are you feeling today?".to_string()
        })
    );
    assert_eq!(h.tts.languages.lock().as_slice(), &[Language::English]);
    assert_eq!(
        h.transport.texts(),
        vec!["Hello! How are you feeling today?"]
    );
    assert_eq!(
        h.transport.presence(),
        vec![
            PresenceState::Composing,
            PresenceState::Recording,
            PresenceState::Paused
        ]
    );
}

fn assert_waited(gap: Duration, delay: Duration) {
    assert!(
        gap >= delay && gap < delay + Duration::from_millis(10),
        "waited {:?}, expected {:?}",
        gap,
        delay
    );
}

#[tokio::test(start_paused = true)]
async fn test_text_reply_waits_before_sending() {
    let h = HarnessBuilder::new().humanized().build();
    let delay = HumanizeConfig::default().text_delay();
    assert_eq!(delay, Duration::from_secs(5));

    let start = Instant::now();
    let event = InboundEvent::text("m1", CONTACT, "ja li o checklist, obrigada");
    let watch = async {
        tokio::time::sleep(delay - Duration::from_millis(1)).await;
        assert!(h.transport.sent().is_empty());
        assert_eq!(h.transport.presence(), vec![PresenceState::Composing]);
    };
    let (response, ()) = tokio::join!(h.orchestrator.handle(&event), watch);

    assert_eq!(
        response,
        Some(OutgoingResponse::TextReply {
            text: "Oi amor, estou aqui com voce.".to_string()
        })
    );
    assert_waited(h.transport.stamped(Stamp::Sent) - start, delay);
    assert_waited(
        h.transport.stamped(Stamp::Presence(PresenceState::Paused)) - start,
        delay,
    );
    assert_eq!(
        h.transport.presence(),
        vec![PresenceState::Composing, PresenceState::Paused]
    );
}

#[tokio::test(start_paused = true)]
async fn test_voice_reply_waits_before_sending() {
    let h = HarnessBuilder::new()
        .humanized()
        .transport(RecordingTransport::with_media(b"OggS voice"))
        .transcript(Some("oi, estou precisando conversar"))
        .build();
    let delay = HumanizeConfig::default().audio_delay();
    assert_eq!(delay, Duration::from_secs(10));

    let dispatch = h
        .orchestrator
        .process(&InboundEvent::audio("m1", CONTACT))
        .await;

    assert!(
        matches!(dispatch.response, Some(OutgoingResponse::AudioReply { .. })),
        "{:?}",
        dispatch.response
    );
    let recording = h.transport.stamped(Stamp::Presence(PresenceState::Recording));
    assert_waited(h.transport.stamped(Stamp::Sent) - recording, delay);
    assert_waited(
        h.transport.stamped(Stamp::Presence(PresenceState::Paused)) - recording,
        delay,
    );
    assert_eq!(h.transport.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_synthesis_fallback_still_waits_audio_delay() {
    let h = HarnessBuilder::new()
        .humanized()
        .transport(RecordingTransport::with_media(b"OggS voice"))
        .transcript(Some("hello, how are you"))
        .llm(ScriptedLlm::replying("Hello! How are you feeling today?"))
        .tts_works(false)
        .build();
    let delay = HumanizeConfig::default().audio_delay();

    let response = h
        .orchestrator
        .handle(&InboundEvent::audio("m1", CONTACT))
        .await;

    assert_eq!(
        response,
        Some(OutgoingResponse::TextReply {
            text: "Hello! How are you feeling today?".to_string()
        })
    );
    let recording = h.transport.stamped(Stamp::Presence(PresenceState::Recording));
    assert_waited(h.transport.stamped(Stamp::Sent) - recording, delay);
    assert_eq!(
        h.transport.texts(),
        vec!["Hello! How are you feeling today?"]
    );
}

#[tokio::test]
async fn test_voice_note_trigger_delivers_files() {
    let h = HarnessBuilder::new()
        .transport(RecordingTransport::with_media(b"OggS voice"))
        .transcript(Some("Checklist."))
        .build();

    let response = h
        .orchestrator
        .handle(&InboundEvent::audio("m1", CONTACT))
        .await;
    assert!(matches!(response, Some(OutgoingResponse::FileDelivery { .. })));
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_download_failure_apology() {
    let h = HarnessBuilder::new()
        .transcript(Some("nunca usado"))
        .build();

    let dispatch = h
        .orchestrator
        .process(&InboundEvent::audio("m1", CONTACT))
        .await;

    assert_eq!(
        dispatch.response,
        Some(OutgoingResponse::ApologyText {
            text: messages().download_failure
        })
    );
    assert_eq!(
        dispatch.path,
        vec![
            DialogueState::Received,
            DialogueState::Filtered,
            DialogueState::Done
        ]
    );
    assert_eq!(h.stt.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.llm.calls(), 0);
    assert_eq!(h.transport.texts(), vec![messages().download_failure]);
}

#[tokio::test]
async fn test_transcription_failure_apology() {
    let h = HarnessBuilder::new()
        .transport(RecordingTransport::with_media(b"OggS voice"))
        .transcript(None)
        .build();

    let response = h
        .orchestrator
        .handle(&InboundEvent::audio("m1", CONTACT))
        .await;

    assert_eq!(
        response,
        Some(OutgoingResponse::ApologyText {
            text: messages().transcription_failure
        })
    );
    assert_eq!(h.stt.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.llm.calls(), 0);
    assert!(h.transport.presence().is_empty());
}

#[tokio::test]
async fn test_call_offer_is_rejected_with_message() {
    let h = HarnessBuilder::new().build();

    let offer = CallEvent {
        id: "call-1".to_string(),
        from: CONTACT.to_string(),
        status: CallStatus::Offer,
    };
    assert!(h.orchestrator.handle_call(&offer).await);
    assert_eq!(h.transport.rejected.lock().as_slice(), &["call-1".to_string()]);
    assert_eq!(h.transport.texts(), vec![messages().call_rejection]);

    let ended = CallEvent {
        status: CallStatus::Terminate,
        ..offer
    };
    assert!(!h.orchestrator.handle_call(&ended).await);
    assert_eq!(h.transport.rejected.lock().len(), 1);
}

#[tokio::test]
async fn test_exchanges_survive_restart() {
    let h = HarnessBuilder::new().durable().build();

    h.orchestrator
        .handle(&InboundEvent::text("m1", CONTACT, "oi"))
        .await;
    h.orchestrator
        .handle(&InboundEvent::text("m2", CONTACT, "tudo bem?"))
        .await;

    let reloaded = JsonFileHistoryStore::new(h.dir.path().join("historico_conversas.json"));
    assert_eq!(reloaded.load().await.unwrap(), 1);
    assert_eq!(
        reloaded.history(CONTACT).await,
        h.store.history(CONTACT).await
    );
    assert_eq!(reloaded.history(CONTACT).await.len(), 4);
}

#[tokio::test]
async fn test_concurrent_contacts_are_independent() {
    let h = Arc::new(HarnessBuilder::new().build());

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let h = h.clone();
            tokio::spawn(async move {
                let contact = format!("55119999900{:02}@s.whatsapp.net", i % 3);
                h.orchestrator
                    .handle(&InboundEvent::text(format!("m{}", i), contact, "oi"))
                    .await
            })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_some());
    }

    for i in 0..3 {
        let contact = format!("55119999900{:02}@s.whatsapp.net", i);
        let history = h.store.history(&contact).await;
        assert_eq!(history.len(), 4);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, TurnRole::User);
            assert_eq!(pair[1].role, TurnRole::Assistant);
        }
    }
}

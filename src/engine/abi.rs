//! Raw C ABI of the external speech engine.
//!
//! Layouts are byte-packed to match the engine headers. Reason codes are
//! declared as plain integers rather than a Rust enum: the engine may send
//! values outside the documented set, and those must stay representable.

#![allow(non_snake_case)]

use std::os::raw::{c_char, c_void};

pub const MAX_VOICENAME: usize = 80;
pub const CONTROL_LENGTH: usize = 12;
/// Raw audio buffer length requested from the engine, in bytes
pub const CONFIG_RAWBUF_SIZE: u32 = 0x158880;

// Callback reason codes
pub const TEXTBUF_FULL: i32 = 0x65;
pub const TEXTBUF_FLUSH: i32 = 0x66;
pub const TEXTBUF_CLOSE: i32 = 0x67;
pub const RAWBUF_FULL: i32 = 0xC9;
pub const RAWBUF_FLUSH: i32 = 0xCA;
pub const RAWBUF_CLOSE: i32 = 0xCB;
pub const PH_LABEL: i32 = 0x12D;
pub const BOOKMARK: i32 = 0x12E;
pub const AUTOBOOKMARK: i32 = 0x12F;

// Extended output formats
pub const EXTEND_FORMAT_NONE: u32 = 0;
pub const EXTEND_FORMAT_JEITA_RUBY: u32 = 1;
pub const EXTEND_FORMAT_AUTO_BOOKMARK: u32 = 16;
pub const EXTEND_FORMAT_BOTH: u32 = EXTEND_FORMAT_JEITA_RUBY | EXTEND_FORMAT_AUTO_BOOKMARK;

// Job input/output modes
pub const IOMODE_PLAIN_TO_WAVE: u32 = 11;
pub const IOMODE_AIKANA_TO_WAVE: u32 = 12;
pub const IOMODE_JEITA_TO_WAVE: u32 = 13;
pub const IOMODE_PLAIN_TO_AIKANA: u32 = 21;
pub const IOMODE_AIKANA_TO_JEITA: u32 = 32;

pub type ProcTextBuf =
    extern "system" fn(reason_code: i32, job_id: i32, user_data: *mut c_void) -> i32;
pub type ProcRawBuf =
    extern "system" fn(reason_code: i32, job_id: i32, tick: u64, user_data: *mut c_void) -> i32;
pub type ProcEventTts = extern "system" fn(
    reason_code: i32,
    job_id: i32,
    tick: u64,
    name: *const c_char,
    user_data: *mut c_void,
) -> i32;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TJeitaParam {
    pub femaleName: [c_char; MAX_VOICENAME],
    pub maleName: [c_char; MAX_VOICENAME],
    pub pauseMiddle: i32,
    pub pauseLong: i32,
    pub pauseSentence: i32,
    pub control: [c_char; CONTROL_LENGTH],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TSpeakerParam {
    pub voiceName: [c_char; MAX_VOICENAME],
    pub volume: f32,
    pub speed: f32,
    pub pitch: f32,
    pub range: f32,
    pub pauseMiddle: i32,
    pub pauseLong: i32,
    pub pauseSentence: i32,
    pub styleRate: [c_char; MAX_VOICENAME],
}

/// Global parameter block. The engine reports the real size, which may be
/// larger than this struct when more than one speaker is present.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TTtsParam {
    pub size: u32,
    pub procTextBuf: Option<ProcTextBuf>,
    pub procRawBuf: Option<ProcRawBuf>,
    pub procEventTts: Option<ProcEventTts>,
    pub lenTextBufBytes: u32,
    pub lenRawBufBytes: u32,
    pub volume: f32,
    pub pauseBegin: i32,
    pub pauseTerm: i32,
    pub extendFormat: u32,
    pub voiceName: [c_char; MAX_VOICENAME],
    pub jeita: TJeitaParam,
    pub numSpeakers: u32,
    pub __reserved__: i32,
    pub speaker: [TSpeakerParam; 1],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TJobParam {
    pub modeInOut: u32,
    pub userData: *mut c_void,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TConfig {
    pub hzVoiceDB: u32,
    pub dirVoiceDBS: *const c_char,
    pub msecTimeout: u32,
    pub pathLicense: *const c_char,
    pub codeAuthSeed: *const c_char,
    pub lenAuthSeed: u32,
}

pub type ApiInit = unsafe extern "system" fn(config: *mut TConfig) -> i32;
pub type ApiEnd = unsafe extern "system" fn() -> i32;
pub type ApiSetParam = unsafe extern "system" fn(param: *mut c_void) -> i32;
pub type ApiGetParam = unsafe extern "system" fn(param: *mut c_void, size: *mut u32) -> i32;
pub type ApiLangLoad = unsafe extern "system" fn(dir_lang: *const c_char) -> i32;
pub type ApiVoiceLoad = unsafe extern "system" fn(voice_name: *const c_char) -> i32;
pub type ApiVoiceClear = unsafe extern "system" fn() -> i32;
pub type ApiTextToKana =
    unsafe extern "system" fn(job_id: *mut i32, param: *mut TJobParam, text: *const c_char) -> i32;
pub type ApiCloseKana = unsafe extern "system" fn(job_id: i32, use_event: i32) -> i32;
pub type ApiGetKana = unsafe extern "system" fn(
    job_id: i32,
    text_buf: *mut c_char,
    len_buf: u32,
    size: *mut u32,
    pos: *mut u32,
) -> i32;
pub type ApiTextToSpeech =
    unsafe extern "system" fn(job_id: *mut i32, param: *mut TJobParam, text: *const c_char) -> i32;
pub type ApiCloseSpeech = unsafe extern "system" fn(job_id: i32, use_event: i32) -> i32;
pub type ApiGetData =
    unsafe extern "system" fn(job_id: i32, raw_buf: *mut i16, len_buf: u32, size: *mut u32) -> i32;

/// Resolved entry points of one loaded engine library.
#[derive(Clone, Copy)]
pub struct EngineSymbols {
    pub init: ApiInit,
    pub end: ApiEnd,
    pub voice_load: ApiVoiceLoad,
    pub voice_clear: ApiVoiceClear,
    pub set_param: ApiSetParam,
    pub get_param: ApiGetParam,
    pub lang_load: ApiLangLoad,
    pub text_to_kana: ApiTextToKana,
    pub close_kana: ApiCloseKana,
    pub get_kana: ApiGetKana,
    pub text_to_speech: ApiTextToSpeech,
    pub close_speech: ApiCloseSpeech,
    pub get_data: ApiGetData,
}

/// Decorated export names of the 32-bit engine library, in [`EngineSymbols`]
/// field order.
pub const SYMBOL_NAMES: [&str; 13] = [
    "_AITalkAPI_Init@4",
    "_AITalkAPI_End@0",
    "_AITalkAPI_VoiceLoad@4",
    "_AITalkAPI_VoiceClear@0",
    "_AITalkAPI_SetParam@4",
    "_AITalkAPI_GetParam@8",
    "_AITalkAPI_LangLoad@4",
    "_AITalkAPI_TextToKana@12",
    "_AITalkAPI_CloseKana@8",
    "_AITalkAPI_GetKana@20",
    "_AITalkAPI_TextToSpeech@12",
    "_AITalkAPI_CloseSpeech@8",
    "_AITalkAPI_GetData@16",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_param_is_packed() {
        assert_eq!(
            std::mem::size_of::<TJobParam>(),
            4 + std::mem::size_of::<*mut c_void>()
        );
    }

    #[test]
    fn test_reason_families_do_not_overlap() {
        let text = [TEXTBUF_FULL, TEXTBUF_FLUSH, TEXTBUF_CLOSE];
        let raw = [RAWBUF_FULL, RAWBUF_FLUSH, RAWBUF_CLOSE];
        assert!(text.iter().all(|code| !raw.contains(code)));
    }
}

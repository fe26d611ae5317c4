//! Windows implementation of the OS seam: key injection, key-state
//! snapshots and the WH_KEYBOARD_LL push producer.

use crate::backend::Backend;
use crate::engine::EngineHandle;
use crate::types::KeyCode;
use std::sync::Mutex;
use tracing::info;
use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, GetKeyState, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW,
    TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL, WM_KEYUP,
    WM_SYSKEYUP,
};

/// Magic number to identify our own injected events.
const INJECTED_EXTRA_INFO: usize = 0xFFA1A3A5;

static HOOK_HANDLE: Mutex<Option<HHOOK>> = Mutex::new(None);
static HOOK_ENGINE: Mutex<Option<EngineHandle>> = Mutex::new(None);

/// System-backed `Backend`: SendInput injection, GetAsyncKeyState
/// snapshots and GetKeyState lock queries.
pub struct WindowsBackend;

impl WindowsBackend {
    fn send_key(&self, code: KeyCode, up: bool) -> anyhow::Result<()> {
        let mut flags = KEYBD_EVENT_FLAGS(0);
        if up {
            flags |= KEYEVENTF_KEYUP;
        }

        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(code),
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: INJECTED_EXTRA_INFO,
                },
            },
        };

        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            return Err(anyhow::anyhow!("SendInput rejected key {code:#x}"));
        }
        Ok(())
    }
}

impl Backend for WindowsBackend {
    fn is_down(&self, code: KeyCode) -> bool {
        unsafe { GetAsyncKeyState(code as i32) as u16 & 0x8000 != 0 }
    }

    fn inject_press(&self, code: KeyCode) -> anyhow::Result<()> {
        self.send_key(code, false)
    }

    fn inject_release(&self, code: KeyCode) -> anyhow::Result<()> {
        self.send_key(code, true)
    }

    fn lock_state(&self, code: KeyCode) -> bool {
        // Low bit carries the toggle state.
        unsafe { GetKeyState(code as i32) as u16 & 0x0001 != 0 }
    }

    fn toggle_lock(&self, code: KeyCode) -> anyhow::Result<()> {
        self.send_key(code, false)?;
        self.send_key(code, true)
    }
}

/// Installs the low-level keyboard hook feeding `handle`.
/// Must be called from a thread that pumps messages.
pub fn install(handle: EngineHandle) -> anyhow::Result<()> {
    info!("installing keyboard hook");

    let hook_id =
        unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(hook_proc), HINSTANCE::default(), 0) }?;
    if hook_id.is_invalid() {
        return Err(anyhow::anyhow!("SetWindowsHookExW returned invalid handle"));
    }

    *HOOK_ENGINE.lock().unwrap() = Some(handle);
    *HOOK_HANDLE.lock().unwrap() = Some(hook_id);
    info!("keyboard hook installed");
    Ok(())
}

/// Releases the hook registration. Safe to call when nothing is installed.
pub fn uninstall() {
    let mut hook = HOOK_HANDLE.lock().unwrap();
    if let Some(handle) = hook.take() {
        unsafe {
            let _ = UnhookWindowsHookEx(handle);
        }
        info!("keyboard hook uninstalled");
    }
    *HOOK_ENGINE.lock().unwrap() = None;
}

/// Blocking message loop for a dedicated hook thread.
pub fn run_message_loop() {
    info!("starting hook message loop");
    let mut msg = MSG::default();
    unsafe {
        // Force message queue creation before the first GetMessage.
        let _ = PeekMessageW(
            &mut msg,
            None,
            0,
            0,
            windows::Win32::UI::WindowsAndMessaging::PEEK_MESSAGE_REMOVE_TYPE(0),
        );

        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    info!("hook message loop exited");
}

unsafe extern "system" fn hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code < 0 {
        return CallNextHookEx(None, code, wparam, lparam);
    }

    let kbd = &*(lparam.0 as *const KBDLLHOOKSTRUCT);

    // Our own injections echo back through the hook; the tracker already
    // accounts for them, so they only pass along the chain.
    if kbd.dwExtraInfo != INJECTED_EXTRA_INFO {
        let msg = wparam.0 as u32;
        let up = msg == WM_KEYUP || msg == WM_SYSKEYUP;

        if let Some(engine) = HOOK_ENGINE.lock().unwrap().as_ref() {
            engine.push_edge(kbd.vkCode as KeyCode, !up);
        }
    }

    // Observe only: the engine reports and injects, it never swallows
    // the original event from the dispatch chain.
    CallNextHookEx(None, code, wparam, lparam)
}

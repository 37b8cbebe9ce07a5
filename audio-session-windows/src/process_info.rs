//! Process metadata lookup.
//!
//! Resolves a session's owning process to its executable path and the
//! FileDescription string from the executable's version resource. Every
//! failure path collapses to `None`; metadata is display sugar, never
//! load-bearing.

use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{CloseHandle, ERROR_INSUFFICIENT_BUFFER};
use windows::Win32::Storage::FileSystem::{
    GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW,
};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};

use audio_session_core::ProcessMetadata;

/// `ProcessMetadata` backed by the Win32 process and version-info APIs.
pub struct WindowsProcessMetadata;

impl ProcessMetadata for WindowsProcessMetadata {
    fn executable_path(&self, pid: u32) -> Option<PathBuf> {
        query_image_path(pid)
    }

    fn file_description(&self, pid: u32) -> Option<String> {
        let path = query_image_path(pid)?;
        read_file_description(&path)
    }
}

fn query_image_path(pid: u32) -> Option<PathBuf> {
    if pid == 0 {
        return None;
    }
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;

        // Extended-length paths can exceed MAX_PATH; grow up to the
        // 32767-character \\?\ limit before giving up.
        let mut capacity = 1024usize;
        let path = loop {
            let mut buffer = vec![0u16; capacity];
            let mut len = buffer.len() as u32;
            match QueryFullProcessImageNameW(
                handle,
                PROCESS_NAME_WIN32,
                PWSTR(buffer.as_mut_ptr()),
                &mut len,
            ) {
                Ok(()) => {
                    break Some(PathBuf::from(String::from_utf16_lossy(
                        &buffer[..len as usize],
                    )))
                }
                Err(err)
                    if err.code() == ERROR_INSUFFICIENT_BUFFER.to_hresult()
                        && capacity < 32_768 =>
                {
                    capacity *= 2;
                }
                Err(_) => break None,
            }
        };

        let _ = CloseHandle(handle);
        path
    }
}

/// FileDescription from the executable's version resource, using the
/// first language/codepage pair the resource advertises.
fn read_file_description(path: &Path) -> Option<String> {
    unsafe {
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();
        let file = PCWSTR(wide.as_ptr());

        let size = GetFileVersionInfoSizeW(file, None);
        if size == 0 {
            return None;
        }

        let mut data = vec![0u8; size as usize];
        GetFileVersionInfoW(file, None, size, data.as_mut_ptr().cast()).ok()?;

        // Translation table: pairs of (language id, codepage).
        let mut value: *mut core::ffi::c_void = std::ptr::null_mut();
        let mut value_len = 0u32;
        let translation_query = crate::com::to_wide("\\VarFileInfo\\Translation");
        if !VerQueryValueW(
            data.as_ptr().cast(),
            PCWSTR(translation_query.as_ptr()),
            &mut value,
            &mut value_len,
        )
        .as_bool()
            || value_len < 4
        {
            return None;
        }
        let pair = *(value as *const [u16; 2]);

        let query = crate::com::to_wide(&format!(
            "\\StringFileInfo\\{:04x}{:04x}\\FileDescription",
            pair[0], pair[1]
        ));
        let mut text: *mut core::ffi::c_void = std::ptr::null_mut();
        let mut text_len = 0u32;
        if !VerQueryValueW(
            data.as_ptr().cast(),
            PCWSTR(query.as_ptr()),
            &mut text,
            &mut text_len,
        )
        .as_bool()
            || text_len == 0
        {
            return None;
        }

        let chars = std::slice::from_raw_parts(text as *const u16, text_len as usize);
        let end = chars.iter().position(|&c| c == 0).unwrap_or(chars.len());
        let description = String::from_utf16_lossy(&chars[..end]);
        let trimmed = description.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

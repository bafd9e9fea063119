//! Accessibility permission utilities for macOS.
//!
//! Reading the element tree under the pointer and installing an active event
//! tap both require the process to be listed under Privacy & Security ›
//! Accessibility.

use std::ffi::c_void;

use core_foundation::base::TCFType;
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::CFDictionary;
use core_foundation::string::CFString;

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: *const c_void) -> bool;
}

// Key for prompting the user for accessibility permissions
const K_AX_TRUSTED_CHECK_OPTION_PROMPT: &str = "AXTrustedCheckOptionPrompt";

/// Checks if the process has accessibility permissions, without prompting.
#[must_use]
pub fn is_trusted() -> bool { unsafe { AXIsProcessTrusted() } }

/// Checks accessibility permissions and asks the system to prompt for them.
///
/// The prompt only appears when the process is not yet trusted. Granting takes
/// effect without a restart: the next epoch after a `PermissionChanged` reset
/// picks it up.
#[must_use]
pub fn check_and_prompt() -> bool {
    let key = CFString::new(K_AX_TRUSTED_CHECK_OPTION_PROMPT);
    let value = CFBoolean::true_value();

    let pairs = [(key.as_CFType(), value.as_CFType())];
    let options = CFDictionary::from_CFType_pairs(&pairs);

    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef().cast()) }
}

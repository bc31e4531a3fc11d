// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// amplibridge: Native Amplitude SDK bindings.
//
// The `traits` module is the seam the dispatcher is written against. The
// platform modules wrap the vendor SDK through JNI (Android) or Objective-C
// message sends (iOS). Everywhere else the in-memory client is used, which
// records calls and logs them instead of uploading anything.

use std::sync::Arc;

pub mod memory;
pub mod traits;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(target_os = "android")]
pub mod android;

pub use traits::{AnalyticsClient, ClientFactory};

/// Client factory for the target operating system.
pub fn platform_client_factory() -> Arc<dyn ClientFactory> {
    #[cfg(target_os = "ios")]
    {
        Arc::new(ios::IosClientFactory::new())
    }
    #[cfg(target_os = "android")]
    {
        Arc::new(android::AndroidClientFactory::new())
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        Arc::new(memory::MemoryClientFactory::new())
    }
}

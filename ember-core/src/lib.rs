//! Ember Core
//!
//! This crate provides the client-side runtime for the Ember UI framework.
//! It implements:
//!
//! - Reactive primitives (signals, state containers, effects)
//! - A batched render scheduler driven by an injected host capability
//! - An element-tree materializer over a headless document
//! - A hash router with guarded routes
//! - The module registry and hydration protocol that revive server-rendered
//!   pages
//!
//! # Architecture
//!
//! Everything hangs off an explicitly constructed [`Runtime`]:
//!
//! - `reactive`: signals, effects and dependency tracking
//! - `scheduler`: the pending re-render queue and host scheduling policies
//! - `view`: element trees and the materializer
//! - `dom`: the in-memory document, its location and event dispatch
//! - `router`: signal-backed hash routing
//! - `hydration`: client modules, payload parsing and revival
//!
//! # Example
//!
//! ```rust,ignore
//! use ember_core::{h, Props, Runtime, RuntimeConfig};
//!
//! let runtime = Runtime::new(RuntimeConfig::default());
//! let document = runtime.document();
//! let root = document.create_element("div");
//! document.append_child(document.body(), root);
//!
//! let count = runtime.create_signal(0);
//! let reader = count.clone();
//! runtime.mount(root, move |_| h("p", Props::new(), [reader.get()]));
//!
//! // Writes are batched until the host's next frame.
//! count.set(1);
//! count.set(2);
//! runtime.run_frame();
//! assert_eq!(document.inner_html(root), "<p>2</p>");
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod hydration;
pub mod reactive;
pub mod router;
pub mod scheduler;
pub mod view;

pub use config::{FallbackPolicy, RuntimeConfig, SchedulerPolicy};
pub use dom::{Document, DomId, Event};
pub use error::{ConfigError, HydrationError, RenderError};
pub use hydration::{Args, GlobalScope, Hydrated, HydrationPayload, ModuleRegistry};
pub use reactive::{record, ComponentId, Effect, Record, Runtime, Signal, State};
pub use router::{Route, Router};
pub use scheduler::{FrameQueue, HostScheduler, ImmediateScheduler, TimerScheduler};
pub use view::{h, Component, Node, Props, Rendered};

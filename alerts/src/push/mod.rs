//! Push registration and delivery handling.
//!
//! A [`PushRegistrar`] is selected once per process from the host's integrations and
//! obtains a delivery token: a device token from a native shell or a serialized web push
//! subscription from a browser. [`PushService`] turns that token into an upserted
//! [`PushSubscriber`] keyed by the installation's device id.

mod deferred;
mod device;
mod listeners;
mod native;
mod platform;
mod registrar;
mod service;
mod store;
mod subscriber;
mod web;

pub use deferred::Deferred;
pub use device::{DEVICE_ID_KEY, DeviceIdentity};
pub use listeners::{PushAction, PushEvent, PushListenerHandle, PushNotification, setup_push_listeners};
pub use native::{NativePushBridge, NativeRegistrar, RegistrationEvent};
pub use platform::{PermissionState, Platform, detect_platform};
pub use registrar::{PushHost, PushRegistrar};
pub use service::{PushService, RegistrationOutcome};
pub use store::{MemorySubscriberStore, RestSubscriberStore, SUBSCRIBERS_TABLE, SubscriberStore};
pub use subscriber::{DeliveryScope, PushSubscriber};
pub use web::{WebPushBridge, WebPushKeys, WebPushSubscription, WebRegistrar, decode_vapid_key};

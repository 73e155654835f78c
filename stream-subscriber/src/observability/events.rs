//! Canonical structured event names used across `stream-subscriber`.

// Bootstrap runner events.
pub const BOOTSTRAP_HANDLER_START: &str = "bootstrap_handler_start";
pub const BOOTSTRAP_HANDLER_OK: &str = "bootstrap_handler_ok";
pub const BOOTSTRAP_HANDLER_FAILED: &str = "bootstrap_handler_failed";
pub const BOOTSTRAP_JOIN_START: &str = "bootstrap_join_start";
pub const BOOTSTRAP_JOIN_OK: &str = "bootstrap_join_ok";
pub const BOOTSTRAP_GRACE_EXCEEDED: &str = "bootstrap_grace_exceeded";
pub const SHUTDOWN_SIGNAL_RECEIVED: &str = "shutdown_signal_received";
pub const SHUTDOWN_SIGNAL_UNAVAILABLE: &str = "shutdown_signal_unavailable";
pub const SHUTDOWN_RECEIVED: &str = "shutdown_received";

// Subscriber lifecycle events.
pub const SUBSCRIBER_BUILD_FAILED: &str = "subscriber_build_failed";
pub const SUBSCRIBER_CONNECT_OK: &str = "subscriber_connect_ok";
pub const SUBSCRIBER_CONNECT_FAILED: &str = "subscriber_connect_failed";
pub const SUBSCRIBER_SUBSCRIBE_OK: &str = "subscriber_subscribe_ok";
pub const SUBSCRIBER_SUBSCRIBE_FAILED: &str = "subscriber_subscribe_failed";
pub const SUBSCRIBER_CLOSE_OK: &str = "subscriber_close_ok";
pub const SUBSCRIBER_CLOSE_FAILED: &str = "subscriber_close_failed";
pub const SUBSCRIBER_READ_FAILED: &str = "subscriber_read_failed";
pub const SUBSCRIBER_DECODE_FAILED: &str = "subscriber_decode_failed";
pub const SUBSCRIBER_CHANNEL_CLOSED: &str = "subscriber_channel_closed";
pub const STREAMS_HANDSHAKE_STEP: &str = "streams_handshake_step";

// Consumer events.
pub const CONSUMER_RECEIVE: &str = "consumer_receive";
pub const CONSUMER_CHANNEL_CLOSED: &str = "consumer_channel_closed";
pub const CONSUMER_RECEIVER_MISSING: &str = "consumer_receiver_missing";

// MQTT session events.
pub const MQTT_EVENT_LOOP_ERROR: &str = "mqtt_event_loop_error";
pub const MQTT_EVENT_LOOP_STOPPED: &str = "mqtt_event_loop_stopped";
pub const MQTT_DISCONNECT_TIMEOUT: &str = "mqtt_disconnect_timeout";

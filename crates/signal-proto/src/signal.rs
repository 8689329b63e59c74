//! Client-server signaling messages.

/// Root message of every control frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignalFrame {
    /// Sender clock at send time, milliseconds since the Unix epoch.
    #[prost(uint64, required, tag = "1")]
    pub timestamp_ms: u64,
    #[prost(enumeration = "signal_frame::Type", required, tag = "2")]
    pub r#type: i32,
    #[prost(message, optional, tag = "3")]
    pub join: ::core::option::Option<JoinFrame>,
    #[prost(message, optional, tag = "4")]
    pub joinack: ::core::option::Option<JoinAckFrame>,
    #[prost(message, optional, tag = "5")]
    pub sub: ::core::option::Option<SubscribeFrame>,
    #[prost(message, optional, tag = "6")]
    pub suback: ::core::option::Option<SubscribeAckFrame>,
    #[prost(message, optional, tag = "7")]
    pub index: ::core::option::Option<IndexFrame>,
    #[prost(message, optional, tag = "11")]
    pub leave: ::core::option::Option<LeaveFrame>,
    #[prost(message, optional, tag = "12")]
    pub leave_ack: ::core::option::Option<LeaveAckFrame>,
    #[prost(message, optional, tag = "14")]
    pub bitrates: ::core::option::Option<BitrateFrame>,
    #[prost(message, optional, tag = "17")]
    pub audio_control: ::core::option::Option<AudioControlFrame>,
    #[prost(message, optional, tag = "18")]
    pub audio_metadata: ::core::option::Option<AudioMetadataFrame>,
    #[prost(message, optional, tag = "19")]
    pub audio_stream_id_info: ::core::option::Option<AudioStreamIdInfoFrame>,
    #[prost(message, optional, tag = "20")]
    pub ping_pong: ::core::option::Option<PingPongFrame>,
    #[prost(message, optional, tag = "22")]
    pub client_metric: ::core::option::Option<ClientMetricFrame>,
    #[prost(message, optional, tag = "23")]
    pub data_message: ::core::option::Option<DataMessageFrame>,
}

impl SignalFrame {
    /// Create an otherwise empty frame of the given type.
    #[must_use]
    pub fn of_type(frame_type: signal_frame::Type) -> Self {
        Self {
            r#type: frame_type as i32,
            ..Self::default()
        }
    }

    /// The decoded frame type, or `None` for values this schema does not know.
    #[must_use]
    pub fn frame_type(&self) -> Option<signal_frame::Type> {
        signal_frame::Type::try_from(self.r#type).ok()
    }
}

/// Nested message and enum types in `SignalFrame`.
pub mod signal_frame {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Join = 1,
        JoinAck = 2,
        Subscribe = 3,
        SubscribeAck = 4,
        Index = 5,
        Pause = 7,
        Resume = 8,
        Leave = 9,
        LeaveAck = 10,
        Bitrates = 13,
        AudioControl = 16,
        AudioMetadata = 17,
        AudioStreamIdInfo = 18,
        PingPong = 19,
        AudioStatus = 20,
        ClientMetric = 21,
        DataMessage = 22,
    }

    impl Type {
        /// String value of the enum field name used in the schema.
        #[must_use]
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Type::Join => "JOIN",
                Type::JoinAck => "JOIN_ACK",
                Type::Subscribe => "SUBSCRIBE",
                Type::SubscribeAck => "SUBSCRIBE_ACK",
                Type::Index => "INDEX",
                Type::Pause => "PAUSE",
                Type::Resume => "RESUME",
                Type::Leave => "LEAVE",
                Type::LeaveAck => "LEAVE_ACK",
                Type::Bitrates => "BITRATES",
                Type::AudioControl => "AUDIO_CONTROL",
                Type::AudioMetadata => "AUDIO_METADATA",
                Type::AudioStreamIdInfo => "AUDIO_STREAM_ID_INFO",
                Type::PingPong => "PING_PONG",
                Type::AudioStatus => "AUDIO_STATUS",
                Type::ClientMetric => "CLIENT_METRIC",
                Type::DataMessage => "DATA_MESSAGE",
            }
        }
    }
}

/// Bits of `JoinFrame::flags`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum JoinFlags {
    SendBitrates = 1,
    HasStreamUpdate = 2,
    UseSendSideBwe = 8,
    ExcludeSelfContentInIndex = 16,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientDetails {
    #[prost(string, optional, tag = "1")]
    pub app_version_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub app_version_code: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "3")]
    pub device_model: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "4")]
    pub device_make: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "5")]
    pub platform_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "6")]
    pub platform_version: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "7")]
    pub client_source: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "8")]
    pub sdk_version: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinFrame {
    #[prost(uint32, optional, tag = "1")]
    pub protocol_version: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub max_num_of_videos: ::core::option::Option<u32>,
    /// Bitwise OR of [`JoinFlags`] values.
    #[prost(uint32, optional, tag = "3")]
    pub flags: ::core::option::Option<u32>,
    #[prost(message, optional, tag = "4")]
    pub client_details: ::core::option::Option<ClientDetails>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TurnCredentials {
    #[prost(string, optional, tag = "1")]
    pub username: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub password: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(uint32, optional, tag = "3")]
    pub ttl: ::core::option::Option<u32>,
    #[prost(string, repeated, tag = "4")]
    pub uris: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinAckFrame {
    #[prost(message, optional, tag = "1")]
    pub turn_credentials: ::core::option::Option<TurnCredentials>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaveFrame {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaveAckFrame {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StreamServiceType {
    Rx = 1,
    Tx = 2,
    Duplex = 3,
}

impl StreamServiceType {
    /// Whether this mode carries outgoing media.
    #[must_use]
    pub fn sends(self) -> bool {
        matches!(self, StreamServiceType::Tx | StreamServiceType::Duplex)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StreamMediaType {
    Audio = 1,
    Video = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamDescriptor {
    #[prost(uint32, optional, tag = "1")]
    pub stream_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub framerate: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub max_bitrate_kbps: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "4")]
    pub track_label: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(uint32, optional, tag = "6")]
    pub group_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "7")]
    pub avg_bitrate_bps: ::core::option::Option<u32>,
    /// Stable per-attendee identifier of the publisher.
    #[prost(string, optional, tag = "8")]
    pub attendee_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(enumeration = "StreamMediaType", optional, tag = "9")]
    pub media_type: ::core::option::Option<i32>,
    #[prost(string, optional, tag = "10")]
    pub external_user_id: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeFrame {
    #[prost(enumeration = "StreamServiceType", optional, tag = "1")]
    pub duplex: ::core::option::Option<i32>,
    #[prost(message, repeated, tag = "2")]
    pub send_streams: ::prost::alloc::vec::Vec<StreamDescriptor>,
    #[prost(uint32, repeated, packed = "false", tag = "3")]
    pub receive_stream_ids: ::prost::alloc::vec::Vec<u32>,
    #[prost(string, optional, tag = "4")]
    pub sdp_offer: ::core::option::Option<::prost::alloc::string::String>,
    /// Audio routing hint.
    #[prost(string, optional, tag = "5")]
    pub audio_host: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "6")]
    pub audio_checkin: ::core::option::Option<bool>,
    #[prost(bool, optional, tag = "7")]
    pub audio_muted: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamAllocation {
    #[prost(string, optional, tag = "1")]
    pub track_label: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(uint32, optional, tag = "2")]
    pub stream_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub group_id: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TrackMapping {
    #[prost(uint32, optional, tag = "1")]
    pub stream_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub ssrc: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "3")]
    pub track_label: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeAckFrame {
    #[prost(enumeration = "StreamServiceType", optional, tag = "1")]
    pub duplex: ::core::option::Option<i32>,
    #[prost(message, repeated, tag = "2")]
    pub allocations: ::prost::alloc::vec::Vec<StreamAllocation>,
    #[prost(string, optional, tag = "3")]
    pub sdp_answer: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "4")]
    pub tracks: ::prost::alloc::vec::Vec<TrackMapping>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IndexFrame {
    #[prost(bool, optional, tag = "1")]
    pub at_capacity: ::core::option::Option<bool>,
    #[prost(message, repeated, tag = "2")]
    pub sources: ::prost::alloc::vec::Vec<StreamDescriptor>,
    #[prost(uint32, repeated, packed = "false", tag = "3")]
    pub paused_at_source_ids: ::prost::alloc::vec::Vec<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub num_participants: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Bitrate {
    #[prost(uint32, optional, tag = "1")]
    pub source_stream_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub avg_bitrate_bps: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BitrateFrame {
    #[prost(message, repeated, tag = "1")]
    pub bitrates: ::prost::alloc::vec::Vec<Bitrate>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioControlFrame {
    #[prost(bool, optional, tag = "1")]
    pub muted: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioAttendeeState {
    #[prost(uint32, optional, tag = "1")]
    pub audio_stream_id: ::core::option::Option<u32>,
    /// Attenuation in decibels below full scale (a value of 14 means -14 dB).
    #[prost(uint32, optional, tag = "2")]
    pub volume: ::core::option::Option<u32>,
    #[prost(bool, optional, tag = "3")]
    pub muted: ::core::option::Option<bool>,
    #[prost(uint32, optional, tag = "4")]
    pub signal_strength: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioMetadataFrame {
    #[prost(message, repeated, tag = "1")]
    pub attendee_states: ::prost::alloc::vec::Vec<AudioAttendeeState>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioStreamIdInfo {
    #[prost(uint32, optional, tag = "1")]
    pub audio_stream_id: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "2")]
    pub attendee_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "3")]
    pub muted: ::core::option::Option<bool>,
    #[prost(string, optional, tag = "4")]
    pub external_user_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "5")]
    pub dropped: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioStreamIdInfoFrame {
    #[prost(message, repeated, tag = "1")]
    pub streams: ::prost::alloc::vec::Vec<AudioStreamIdInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PingPongType {
    Ping = 1,
    Pong = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PingPongFrame {
    #[prost(enumeration = "PingPongType", required, tag = "1")]
    pub r#type: i32,
    #[prost(uint32, required, tag = "2")]
    pub ping_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metric {
    #[prost(uint32, optional, tag = "1")]
    pub r#type: ::core::option::Option<u32>,
    #[prost(double, optional, tag = "2")]
    pub value: ::core::option::Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientMetricFrame {
    #[prost(message, repeated, tag = "1")]
    pub global_metrics: ::prost::alloc::vec::Vec<Metric>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataMessagePayload {
    #[prost(string, optional, tag = "1")]
    pub topic: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub data: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(uint32, optional, tag = "3")]
    pub lifetime_ms: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "4")]
    pub sender_attendee_id: ::core::option::Option<::prost::alloc::string::String>,
    /// Server ingest time. Absent or zero on a message bounced back as throttled.
    #[prost(int64, optional, tag = "5")]
    pub ingest_time_ns: ::core::option::Option<i64>,
    #[prost(string, optional, tag = "6")]
    pub sender_external_user_id: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataMessageFrame {
    #[prost(message, repeated, tag = "1")]
    pub messages: ::prost::alloc::vec::Vec<DataMessagePayload>,
}

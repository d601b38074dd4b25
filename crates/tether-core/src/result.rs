// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standard outcome attached to every asynchronous bridge response.
//
// Two code taxonomies travel side by side: the coarse `ErrorCode` and the
// fine-grained per-feature `Code`. Native layers may be newer than this
// client, so an undeclared number decodes to the taxonomy's unknown sentinel
// instead of failing.

use std::fmt;

use crate::value::{Object, Value};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, unknown = $unknown:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $num:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $num ),+
        }

        impl $name {
            /// Decode a wire number. Returns `None` for undeclared values.
            pub fn from_i32(val: i32) -> Option<Self> {
                Some(match val {
                    $( $num => $name::$variant, )+
                    _ => return None,
                })
            }

            /// Decode a wire number, mapping undeclared values to the unknown sentinel.
            pub fn from_wire(val: i64) -> Self {
                i32::try_from(val)
                    .ok()
                    .and_then(Self::from_i32)
                    .unwrap_or($name::$unknown)
            }

            /// Convert to i32 for wire transmission.
            pub fn as_i32(self) -> i32 {
                self as i32
            }
        }
    };
}

wire_enum! {
    /// Coarse outcome taxonomy. Values at or above `Success` are not failures.
    ErrorCode, unknown = Unknown {
        Success = 0,
        /// The call succeeded but the caller owns nothing to return.
        NotOwned = 10,
        /// Payment went through; delivery is pending on the server side.
        ItemDeliveryDelayed = 11,
        ItemPending = 12,
        /// Already authorized.
        Authorized = 20,
        IapSuccess = 90,
        InvalidParam = -1,
        NotSupported = -2,
        InProgress = -3,
        Timeout = -4,
        Network = -5,
        Canceled = -6,
        NeedInitialize = -7,
        ResponseFail = -8,
        InvalidSession = -9,
        NeedRestore = -10,
        ConflictPlayer = -11,
        Blacklist = -12,
        DeveloperError = -13,
        DuplicatedPromotionCode = -14,
        PlayerChange = -15,
        UserOut = -16,
        /// The host must run its exit flow.
        NeedExit = -17,
        Undefined = -98,
        Unknown = -99,
    }
}

wire_enum! {
    /// Fine-grained per-feature outcome codes.
    Code, unknown = CommonUnknown {
        Success = 0,
        RealNameVerification = 2100,
        RefundUser = 2300,
        CommonHttpConnectionException = -1,
        CommonHttpConnectionOpenException = -2,
        CommonHttpContentEncodingNotSupported = -3,
        CommonHttpDecryptionFailed = -4,
        CommonHttpResponseException = -5,
        CommonHttpInvalidBody = -6,
        CommonHttpInvalidJson = -7,
        CommonHttpInvalidUrlRequest = -8,
        CommonHttpInvalidUrl = -9,
        CommonHttpGzipDecodeFailed = -10,
        CommonHttpNetworkError = -11,
        CommonLibraryMissing = -12,
        TestError = -800,
        TestWithNsError = -801,
        TestWithNsString = -802,
        TestWithNsDictionary = -803,
        CommonUnknown = -999,
        AppleLoginCancel = -1200401,
        AppleResponseFailLogin = -1200402,
        AppleTimeOut = -1200403,
        AppleResponseFailReportScore = -1200404,
        AppleInProgressGameCenterVc = -1200405,
        AppleResponseFailLoadAchievements = -1200406,
        AppleResponseFailReportAchievements = -1200407,
        AppleResponseFailResetAchievements = -1200408,
        AppleNotSupported = -1200409,
        AppleInProgress = -1200410,
        AppleResponseError = -1200411,
        AppleCancel = -1200412,
        PlatformHelperOsNotSupported = -7000001,
        PlatformHelperOsVersionNotSupported = -7000002,
        PlatformHelperEmptyPermissions = -7000003,
        DataStoreNotExistKey = -8000001,
        DataStoreNotExistColumn = -8000002,
        DataStoreNotExistPublicKey = -8000003,
        DataStoreNotInitialized = -8000004,
        DataStoreNeedSignIn = -8000005,
        DataStoreDisabled = -8000006,
        DataStoreResponseError = -8000007,
        DataStoreInvalidParam = -8000008,
        DataStoreGameIsBeingInspected = -8000009,
    }
}

impl ErrorCode {
    fn is_success(self) -> bool {
        self.as_i32() >= ErrorCode::Success.as_i32()
    }
}

impl Code {
    fn is_success(self) -> bool {
        self.as_i32() >= Code::Success.as_i32()
    }
}

/// Success/error descriptor delivered with every asynchronous outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEnvelope {
    pub error_code: ErrorCode,
    pub code: Code,
    pub error_message: String,
    pub message: String,
    pub latency_ms: i64,
}

impl Default for ResultEnvelope {
    fn default() -> Self {
        Self {
            error_code: ErrorCode::Success,
            code: Code::Success,
            error_message: "SUCCESS".into(),
            message: "SUCCESS".into(),
            latency_ms: 0,
        }
    }
}

impl ResultEnvelope {
    /// A failure built on the engine side (gateway loss, expiry, unsupported call).
    pub fn failure(error_code: ErrorCode, code: Code, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error_code,
            code,
            error_message: message.clone(),
            message,
            latency_ms: 0,
        }
    }

    /// Decode the `resultAPI` sub-object of a native response.
    ///
    /// A response without one is reported as a failed response rather than
    /// a silent success.
    pub fn from_response(response: &Value) -> Self {
        match response.get_field("resultAPI") {
            Some(api @ Value::Object(_)) => Self::from_value(api),
            _ => Self::failure(ErrorCode::ResponseFail, Code::CommonUnknown, "missing resultAPI"),
        }
    }

    /// Decode a `resultAPI` object, substituting defaults for absent fields.
    ///
    /// When only one of `errorCode`/`code` is present, the absent one takes
    /// the success or unknown baseline of the one that is, so a lone failing
    /// code is never masked by a defaulted success.
    pub fn from_value(api: &Value) -> Self {
        let defaults = Self::default();
        let error_code = api
            .get_field("errorCode")
            .and_then(Value::as_i64)
            .map(ErrorCode::from_wire);
        let code = api.get_field("code").and_then(Value::as_i64).map(Code::from_wire);

        let (error_code, code) = match (error_code, code) {
            (Some(e), Some(c)) => (e, c),
            (Some(e), None) => (e, if e.is_success() { Code::Success } else { Code::CommonUnknown }),
            (None, Some(c)) => (if c.is_success() { ErrorCode::Success } else { ErrorCode::Unknown }, c),
            (None, None) => (defaults.error_code, defaults.code),
        };

        Self {
            error_code,
            code,
            error_message: api.str_or("errorMessage", &defaults.error_message).to_owned(),
            message: api.str_or("message", &defaults.message).to_owned(),
            latency_ms: api.i64_or("latencyMs", defaults.latency_ms),
        }
    }

    /// Either taxonomy at or above its success baseline counts as success.
    pub fn is_success(&self) -> bool {
        self.error_code.is_success() || self.code.is_success()
    }

    /// Exact check for the exit-flow sentinel.
    pub fn need_exit(&self) -> bool {
        self.error_code == ErrorCode::NeedExit
    }

    /// Wire form, as placed under `resultAPI` in a response.
    pub fn to_value(&self) -> Value {
        let mut api = Object::new();
        api.insert("errorCode", self.error_code.as_i32());
        api.insert("code", self.code.as_i32());
        api.insert("errorMessage", self.error_message.as_str());
        api.insert("message", self.message.as_str());
        api.insert("latencyMs", self.latency_ms);
        Value::Object(api)
    }
}

impl fmt::Display for ResultEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ResultAPI {{ errorCode = {:?}, Code = {:?}, msg = {}",
            self.error_code, self.code, self.error_message
        )?;
        if self.latency_ms != 0 {
            write!(f, ", latencyMs = {}", self.latency_ms)?;
        }
        f.write_str(" }")
    }
}

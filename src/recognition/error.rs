//! 识别链路错误类型。
//!
//! 除无效密钥会被改写为固定提示外，服务端返回的消息原样透传给用户。

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// 既没有保存的密钥，也没有构建时默认值；不会发起任何网络请求。
    #[error("API Key 未配置，请先在设置中粘贴你的密钥")]
    MissingCredential,

    #[error("API Key 似乎无效，请在设置中检查")]
    InvalidCredential,

    /// 服务端错误，消息原样保留。
    #[error("{0}")]
    Service(String),

    #[error("网络错误：{0}")]
    Network(String),

    #[error("识别请求超时（{0}秒）")]
    Timeout(u64),

    #[error("响应格式错误：{0}")]
    MalformedResponse(String),

    #[error("密钥存储错误：{0}")]
    CredentialStore(String),

    #[error("不支持的语言：{0}")]
    UnsupportedLanguage(String),
}

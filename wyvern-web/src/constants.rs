//! 框架环境变量名称定义

// ==================== Server 配置 ====================

/// 服务器监听地址
pub const ENV_HOST: &str = "WYVERN_HOST";

/// 服务器监听端口
pub const ENV_PORT: &str = "WYVERN_PORT";

/// 运行环境（"production" 开启生产模式）
pub const ENV_PROFILE: &str = "WYVERN_ENV";

/// 是否启用 CORS
pub const ENV_ENABLE_CORS: &str = "WYVERN_ENABLE_CORS";

/// 是否启用请求日志
pub const ENV_ENABLE_REQUEST_LOGGING: &str = "WYVERN_ENABLE_REQUEST_LOGGING";

/// JSON 请求体大小上限（字节）
pub const ENV_JSON_LIMIT: &str = "WYVERN_JSON_LIMIT";

// ==================== 模板引擎配置 ====================

/// 模板 glob 模式
pub const ENV_TEMPLATE_PATTERN: &str = "WYVERN_TEMPLATE_PATTERN";

/// 是否启用模板热加载
pub const ENV_TEMPLATE_HOT_RELOAD: &str = "WYVERN_TEMPLATE_HOT_RELOAD";

// ==================== 会话配置 ====================

/// 会话 Cookie 名称
pub const ENV_SESSION_COOKIE: &str = "WYVERN_SESSION_COOKIE";

/// 会话存活时间（秒）
pub const ENV_SESSION_TTL: &str = "WYVERN_SESSION_TTL";

// ==================== 文件配置 ====================

/// 文件存储根目录
pub const ENV_STORAGE_ROOT: &str = "WYVERN_STORAGE_ROOT";

/// 文件缓存目录
pub const ENV_CACHE_DIR: &str = "WYVERN_CACHE_DIR";

/// 上传文件大小上限（字节）
pub const ENV_MAX_FILE_SIZE: &str = "WYVERN_MAX_FILE_SIZE";

/// multipart 字段数量上限
pub const ENV_MAX_FIELDS: &str = "WYVERN_MAX_FIELDS";

//! User-facing text for errors and success notices.

use super::errors::{AuthError, AuthOperation, Field, InputProblem, ProfileOperation};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    En,
    #[default]
    ZhTw,
}

impl Locale {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            "zh-tw" | "zh-hant" | "zh" => Ok(Self::ZhTw),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Successful outcomes shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    VerificationSent { email: String },
    VerificationResent,
    AlreadyVerified,
    EmailVerified,
    SignedIn { email: String },
    SignedOut,
    PasswordResetSent,
    PasswordResetComplete,
    ResetCodeValid { email: String },
    ProfileSaved,
}

impl Notice {
    #[must_use]
    pub fn localized(&self, locale: Locale) -> String {
        match locale {
            Locale::ZhTw => match self {
                Self::VerificationSent { email } => format!("驗證郵件已發送至：{email}"),
                Self::VerificationResent => "驗證郵件已重新發送！請查收您的電子郵件。".to_string(),
                Self::AlreadyVerified => "您的電子郵件已完成驗證，請直接登入。".to_string(),
                Self::EmailVerified => "電子郵件驗證成功！請重新登入。".to_string(),
                Self::SignedIn { email } => format!("登入成功：{email}"),
                Self::SignedOut => "已登出".to_string(),
                Self::PasswordResetSent => "重設密碼連結已發送到您的電子郵件，請查收！".to_string(),
                Self::PasswordResetComplete => "密碼重設成功！請使用新密碼登入。".to_string(),
                Self::ResetCodeValid { email } => format!("正在為 {email} 重設密碼"),
                Self::ProfileSaved => "個人資料更新成功！".to_string(),
            },
            Locale::En => match self {
                Self::VerificationSent { email } => format!("Verification email sent to: {email}"),
                Self::VerificationResent => {
                    "Verification email sent again. Please check your inbox.".to_string()
                }
                Self::AlreadyVerified => {
                    "Your email is already verified. Please sign in.".to_string()
                }
                Self::EmailVerified => "Email verified. Please sign in again.".to_string(),
                Self::SignedIn { email } => format!("Signed in as {email}"),
                Self::SignedOut => "Signed out".to_string(),
                Self::PasswordResetSent => {
                    "A password reset link has been sent to your email.".to_string()
                }
                Self::PasswordResetComplete => {
                    "Password reset. Please sign in with your new password.".to_string()
                }
                Self::ResetCodeValid { email } => format!("Resetting password for {email}"),
                Self::ProfileSaved => "Profile updated.".to_string(),
            },
        }
    }
}

impl AuthError {
    #[must_use]
    pub fn localized(&self, locale: Locale) -> String {
        match locale {
            Locale::ZhTw => self.zh_tw(),
            Locale::En => self.en(),
        }
    }

    fn zh_tw(&self) -> String {
        match self {
            Self::InvalidInput(InputProblem::MissingField(field)) => {
                let name = match field {
                    Field::Email => "電子郵件",
                    Field::Password => "密碼",
                    Field::PasswordConfirmation => "確認密碼",
                    Field::Code => "驗證碼",
                };
                format!("請輸入{name}")
            }
            Self::InvalidInput(InputProblem::PasswordMismatch) => "密碼與確認密碼不符".to_string(),
            Self::InvalidInput(InputProblem::PasswordTooShort) => {
                "密碼長度至少需要6個字元".to_string()
            }
            Self::AccountExists => "此電子郵件已被使用".to_string(),
            Self::AccountNotFound => "找不到此電子郵件帳號".to_string(),
            Self::InvalidCredentials => "電子郵件或密碼錯誤".to_string(),
            Self::EmailNotVerified => "請先驗證您的電子郵件後再登入".to_string(),
            Self::InvalidEmailFormat => "無效的電子郵件格式".to_string(),
            Self::RegistrationDisabled => "此註冊方式目前不可用".to_string(),
            Self::WeakPassword => "密碼強度不足，請使用至少6個字元".to_string(),
            Self::RateLimited => "請求次數過多，請稍後再試".to_string(),
            Self::ExpiredOrInvalidResetLink => "此重設連結已失效或已被使用".to_string(),
            Self::ExpiredOrInvalidVerificationLink => {
                "驗證連結無效或已過期，請重新發送驗證郵件。".to_string()
            }
            Self::AlreadyPending(_) => "處理中，請稍候".to_string(),
            Self::UnknownAuth { operation, detail } => match operation {
                AuthOperation::SignUp => format!("註冊失敗: {detail}"),
                AuthOperation::SignIn => format!("登入失敗: {detail}"),
                AuthOperation::SignOut => format!("登出失敗: {detail}"),
                AuthOperation::ResendVerification => {
                    "重新發送驗證郵件失敗，請稍後再試。".to_string()
                }
                AuthOperation::ApplyVerification => {
                    "驗證連結無效或已過期，請重新發送驗證郵件。".to_string()
                }
                AuthOperation::RequestPasswordReset => {
                    "發送重設密碼連結失敗，請稍後再試".to_string()
                }
                AuthOperation::VerifyResetCode => "此重設連結已失效或已被使用".to_string(),
                AuthOperation::ConfirmPasswordReset => "重設密碼失敗，請稍後再試".to_string(),
            },
            Self::ProfileIo { operation, detail } => match operation {
                ProfileOperation::Load => format!("載入個人資料時發生錯誤: {detail}"),
                ProfileOperation::Save => format!("更新個人資料時發生錯誤: {detail}"),
            },
        }
    }

    fn en(&self) -> String {
        match self {
            Self::InvalidInput(InputProblem::MissingField(field)) => {
                format!("Please enter your {field}")
            }
            Self::InvalidInput(InputProblem::PasswordMismatch) => {
                "Password and confirmation do not match".to_string()
            }
            Self::InvalidInput(InputProblem::PasswordTooShort) => {
                "Password must be at least 6 characters".to_string()
            }
            Self::AccountExists => "This email is already in use".to_string(),
            Self::AccountNotFound => "No account found for this email".to_string(),
            Self::InvalidCredentials => "Incorrect email or password".to_string(),
            Self::EmailNotVerified => "Please verify your email before signing in".to_string(),
            Self::InvalidEmailFormat => "Invalid email format".to_string(),
            Self::RegistrationDisabled => "This sign-up method is currently unavailable".to_string(),
            Self::WeakPassword => "Password is too weak; use at least 6 characters".to_string(),
            Self::RateLimited => "Too many requests, please try again later".to_string(),
            Self::ExpiredOrInvalidResetLink => {
                "This reset link has expired or was already used".to_string()
            }
            Self::ExpiredOrInvalidVerificationLink => {
                "The verification link is invalid or expired; please request a new one.".to_string()
            }
            Self::AlreadyPending(operation) => format!("{operation} is already in progress"),
            Self::UnknownAuth { operation, detail } => {
                format!("{} failed: {detail}", capitalize(operation.as_str()))
            }
            Self::ProfileIo { operation, detail } => match operation {
                ProfileOperation::Load => format!("Could not load profile: {detail}"),
                ProfileOperation::Save => format!("Could not update profile: {detail}"),
            },
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

//! API 密钥保护
//!
//! # 设计思路
//!
//! 配置文件中的密钥以 `dpapi:<base64>` 形式保存；不带前缀的值视为旧版明文，原样读回。
//! 加解密失败从不中断流程：加密失败返回空串（调用方退回明文保存），
//! 解密失败返回空串（等同于“未设置密钥”）。
//!
//! # 实现思路
//!
//! - Windows：`CryptProtectData` / `CryptUnprotectData`（当前用户范围），
//!   明文按 UTF-16LE 编码，与旧版配置兼容。
//! - 其他平台：AES-256-GCM（`ring`），密钥由主机名 + 用户名 + 固定盐经 SHA-256 派生，
//!   令牌为 `base64(nonce || ciphertext)`。

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::AppError;

pub const PROTECTED_PREFIX: &str = "dpapi:";

/// 加密密钥；空输入或失败时返回空串。
pub fn protect(plain: &str) -> String {
    if plain.is_empty() {
        return String::new();
    }
    match platform::seal(plain) {
        Ok(blob) => format!("{}{}", PROTECTED_PREFIX, STANDARD.encode(blob)),
        Err(err) => {
            log::error!("🔐 {}", err);
            String::new()
        }
    }
}

/// 解密密钥；无前缀视为旧版明文原样返回，失败返回空串。
pub fn unprotect(stored: &str) -> String {
    if stored.is_empty() {
        return String::new();
    }
    let Some(b64) = stored.strip_prefix(PROTECTED_PREFIX) else {
        return stored.to_string();
    };

    let result = STANDARD
        .decode(b64.trim())
        .map_err(|e| AppError::Credential(format!("Base64 解码失败: {}", e)))
        .and_then(platform::open);

    match result {
        Ok(plain) => plain,
        Err(err) => {
            log::error!("🔐 {}", err);
            String::new()
        }
    }
}

pub fn is_protected(stored: &str) -> bool {
    stored.starts_with(PROTECTED_PREFIX)
}

#[cfg(windows)]
mod platform {
    use windows::Win32::Foundation::{HLOCAL, LocalFree};
    use windows::Win32::Security::Cryptography::{
        CRYPT_INTEGER_BLOB, CRYPTPROTECT_UI_FORBIDDEN, CryptProtectData, CryptUnprotectData,
    };
    use windows::core::w;

    use crate::error::AppError;

    fn take_blob(blob: &CRYPT_INTEGER_BLOB) -> Vec<u8> {
        if blob.pbData.is_null() {
            return Vec::new();
        }
        // SAFETY: pbData/cbData 由 DPAPI 分配并返回
        let bytes = unsafe { std::slice::from_raw_parts(blob.pbData, blob.cbData as usize) }.to_vec();
        unsafe {
            let _ = LocalFree(Some(HLOCAL(blob.pbData.cast())));
        }
        bytes
    }

    pub fn seal(plain: &str) -> Result<Vec<u8>, AppError> {
        let mut utf16: Vec<u8> = plain.encode_utf16().flat_map(u16::to_le_bytes).collect();
        let input = CRYPT_INTEGER_BLOB {
            cbData: utf16.len() as u32,
            pbData: utf16.as_mut_ptr(),
        };
        let mut output = CRYPT_INTEGER_BLOB::default();

        unsafe {
            CryptProtectData(
                &input,
                w!("cbfilter"),
                None,
                None,
                None,
                CRYPTPROTECT_UI_FORBIDDEN,
                &mut output,
            )
        }
        .map_err(|e| AppError::Credential(format!("CryptProtectData 失败: {}", e)))?;

        Ok(take_blob(&output))
    }

    pub fn open(mut blob: Vec<u8>) -> Result<String, AppError> {
        let input = CRYPT_INTEGER_BLOB {
            cbData: blob.len() as u32,
            pbData: blob.as_mut_ptr(),
        };
        let mut output = CRYPT_INTEGER_BLOB::default();

        unsafe {
            CryptUnprotectData(
                &input,
                None,
                None,
                None,
                None,
                CRYPTPROTECT_UI_FORBIDDEN,
                &mut output,
            )
        }
        .map_err(|e| AppError::Credential(format!("CryptUnprotectData 失败: {}", e)))?;

        let bytes = take_blob(&output);
        if bytes.len() % 2 != 0 {
            return Err(AppError::Credential(format!(
                "解密结果长度异常: {}",
                bytes.len()
            )));
        }
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units)
            .map_err(|e| AppError::Credential(format!("解密结果不是合法 UTF-16: {}", e)))
    }
}

#[cfg(not(windows))]
mod platform {
    use once_cell::sync::Lazy;
    use ring::aead::{self, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
    use ring::digest::{SHA256, digest};
    use ring::rand::{SecureRandom, SystemRandom};

    use crate::error::AppError;

    const KEY_SALT: &[u8] = b"cbfilter-credential-v1";

    static KEY: Lazy<Result<LessSafeKey, String>> = Lazy::new(derive_key);

    /// 由本机信息派生加密密钥。
    fn derive_key() -> Result<LessSafeKey, String> {
        let mut material = Vec::new();
        if let Ok(host) = hostname::get() {
            material.extend_from_slice(host.as_encoded_bytes());
        }
        if let Ok(user) = std::env::var("USER").or_else(|_| std::env::var("USERNAME")) {
            material.extend_from_slice(user.as_bytes());
        }
        material.extend_from_slice(KEY_SALT);

        let hash = digest(&SHA256, &material);
        let unbound = UnboundKey::new(&aead::AES_256_GCM, hash.as_ref())
            .map_err(|_| "无效的密钥长度".to_string())?;
        Ok(LessSafeKey::new(unbound))
    }

    fn key() -> Result<&'static LessSafeKey, AppError> {
        KEY.as_ref().map_err(|e| AppError::Credential(e.clone()))
    }

    pub fn seal(plain: &str) -> Result<Vec<u8>, AppError> {
        let key = key()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Credential("生成随机数失败".to_string()))?;

        let mut sealed = plain.as_bytes().to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut sealed,
        )
        .map_err(|_| AppError::Credential("加密失败".to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    pub fn open(mut blob: Vec<u8>) -> Result<String, AppError> {
        let key = key()?;
        if blob.len() <= NONCE_LEN {
            return Err(AppError::Credential("密文过短".to_string()));
        }

        let mut ciphertext = blob.split_off(NONCE_LEN);
        let nonce_bytes: [u8; NONCE_LEN] = blob
            .try_into()
            .map_err(|_| AppError::Credential("nonce 长度无效".to_string()))?;

        let plain = key
            .open_in_place(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut ciphertext,
            )
            .map_err(|_| AppError::Credential("解密失败，密钥可能来自其他机器".to_string()))?;

        String::from_utf8(plain.to_vec())
            .map_err(|e| AppError::Credential(format!("解密结果不是合法 UTF-8: {}", e)))
    }
}

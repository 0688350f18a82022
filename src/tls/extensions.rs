//! TLS 1.3 extension encoding and decoding for QUIC.
//!
//! Extension format: type (2 bytes) + length (2 bytes) + data.

use alloc::vec::Vec;

use crate::crypto::NamedGroup;
use crate::error::{Error, Result};
use crate::pki::SignatureScheme;
use crate::tls::codec::{
    begin_u16_len, expect_end, get_u16, get_u32, get_u8, get_vec16, get_vec8, patch_u16_len,
    put_u16, put_u32, put_vec16, put_vec8,
};
use crate::tls::messages::TLS13;

// Extension type codes
pub const EXT_SERVER_NAME: u16 = 0x0000;
pub const EXT_SUPPORTED_GROUPS: u16 = 0x000a;
pub const EXT_SIGNATURE_ALGORITHMS: u16 = 0x000d;
pub const EXT_ALPN: u16 = 0x0010;
pub const EXT_PRE_SHARED_KEY: u16 = 0x0029;
pub const EXT_EARLY_DATA: u16 = 0x002a;
pub const EXT_SUPPORTED_VERSIONS: u16 = 0x002b;
pub const EXT_COOKIE: u16 = 0x002c;
pub const EXT_PSK_KEY_EXCHANGE_MODES: u16 = 0x002d;
pub const EXT_KEY_SHARE: u16 = 0x0033;
pub const EXT_QUIC_TRANSPORT_PARAMS: u16 = 0x0039;

/// `psk_dhe_ke`, the only PSK mode we use.
const PSK_DHE_KE: u8 = 1;

/// Extension codes the engine produces itself; custom extensions may not reuse them.
/// Longest `extension_data` a u16 length prefix can carry.
pub const MAX_EXTENSION_LEN: usize = u16::MAX as usize;

/// Longest HelloRetryRequest cookie that still fits in its extension.
pub const MAX_COOKIE_LEN: usize = MAX_EXTENSION_LEN - 2;

const BUILTIN_EXTENSIONS: [u16; 11] = [
    EXT_SERVER_NAME,
    EXT_SUPPORTED_GROUPS,
    EXT_SIGNATURE_ALGORITHMS,
    EXT_ALPN,
    EXT_PRE_SHARED_KEY,
    EXT_EARLY_DATA,
    EXT_SUPPORTED_VERSIONS,
    EXT_COOKIE,
    EXT_PSK_KEY_EXCHANGE_MODES,
    EXT_KEY_SHARE,
    EXT_QUIC_TRANSPORT_PARAMS,
];

/// An application-defined extension carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomExtension {
    pub ty: u16,
    pub data: Vec<u8>,
}

impl CustomExtension {
    pub fn new(ty: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            ty,
            data: data.into(),
        }
    }

    /// Whether the engine already owns this extension code.
    pub fn is_builtin(&self) -> bool {
        BUILTIN_EXTENSIONS.contains(&self.ty)
    }
}

/// One entry of a `key_share` extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyShareEntry<'a> {
    pub group: u16,
    pub key_exchange: &'a [u8],
}

/// One offered PSK identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PskIdentity<'a> {
    pub identity: &'a [u8],
    pub obfuscated_ticket_age: u32,
}

/// The client's `pre_shared_key` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferedPsks<'a> {
    pub identities: Vec<PskIdentity<'a>>,
    pub binders: Vec<&'a [u8]>,
    /// Length of the encoded binder list including its 2-byte prefix. The
    /// binder covers the ClientHello minus these trailing bytes.
    pub binders_len: usize,
}

/// Parsed extensions from ClientHello.
#[derive(Debug, Default)]
pub struct ClientHelloExtensions<'a> {
    pub server_name: Option<&'a str>,
    /// `supported_versions` lists TLS 1.3.
    pub supports_tls13: bool,
    pub supported_groups: Vec<u16>,
    pub key_shares: Vec<KeyShareEntry<'a>>,
    pub signature_schemes: Vec<u16>,
    pub alpn_protocols: Vec<&'a [u8]>,
    /// `psk_key_exchange_modes` contains `psk_dhe_ke`.
    pub psk_dhe_ke: bool,
    pub early_data: bool,
    pub cookie: Option<&'a [u8]>,
    pub pre_shared_key: Option<OfferedPsks<'a>>,
    /// Raw QUIC transport parameters.
    pub transport_params: Option<&'a [u8]>,
}

/// Parsed extensions from ServerHello or HelloRetryRequest.
#[derive(Debug, Default)]
pub struct ServerHelloExtensions<'a> {
    pub selected_version: Option<u16>,
    /// ServerHello key share.
    pub key_share: Option<KeyShareEntry<'a>>,
    /// HelloRetryRequest: the group the client must use.
    pub selected_group: Option<u16>,
    pub selected_psk: Option<u16>,
    /// HelloRetryRequest cookie.
    pub cookie: Option<&'a [u8]>,
}

/// Parsed extensions from EncryptedExtensions.
#[derive(Debug, Default)]
pub struct EncryptedExtensionsData<'a> {
    /// Selected ALPN protocol.
    pub alpn: Option<&'a [u8]>,
    /// Raw QUIC transport parameters.
    pub transport_params: Option<&'a [u8]>,
    /// The server accepted early data.
    pub early_data: bool,
}

/// Split an extension block into (type, data) pairs, rejecting duplicates.
pub fn split_extensions(data: &[u8]) -> Result<Vec<(u16, &[u8])>> {
    let mut exts: Vec<(u16, &[u8])> = Vec::new();
    let mut off = 0;
    while off < data.len() {
        let ext_type = get_u16(data, &mut off, "extension header")?;
        let ext_data = get_vec16(data, &mut off, "extension")?;
        if exts.iter().any(|(t, _)| *t == ext_type) {
            return Err(Error::IllegalParameter("duplicate extension"));
        }
        exts.push((ext_type, ext_data));
    }
    Ok(exts)
}

/// Find an extension by type in a raw extension block.
pub fn find_custom_extension(extensions: &[u8], ty: u16) -> Result<Option<&[u8]>> {
    Ok(split_extensions(extensions)?
        .into_iter()
        .find(|(t, _)| *t == ty)
        .map(|(_, d)| d))
}

fn put_extension(out: &mut Vec<u8>, ty: u16, data: &[u8]) {
    put_u16(out, ty);
    put_vec16(out, data);
}

/// What a client puts into its ClientHello.
pub struct ClientHelloParams<'a> {
    pub server_name: Option<&'a str>,
    pub groups: &'a [NamedGroup],
    pub key_share: KeyShareEntry<'a>,
    pub signature_schemes: &'a [SignatureScheme],
    pub alpn: &'a [Vec<u8>],
    pub transport_params: Option<&'a [u8]>,
    pub cookie: Option<&'a [u8]>,
    pub early_data: bool,
    pub custom: &'a [CustomExtension],
    /// (identity, obfuscated age, binder length). The binder is written as
    /// zeros; the caller patches it once the truncated hello is hashed.
    pub psk: Option<(&'a [u8], u32, usize)>,
}

/// Encode ClientHello extensions. `pre_shared_key`, when present, is last.
pub fn encode_client_hello_extensions(params: &ClientHelloParams<'_>) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);

    if let Some(name) = params.server_name {
        // ServerNameList: list_length(2) + type(1) + name_length(2) + name
        let mut sni = Vec::with_capacity(5 + name.len());
        put_u16(&mut sni, (3 + name.len()) as u16);
        sni.push(0);
        put_vec16(&mut sni, name.as_bytes());
        put_extension(&mut out, EXT_SERVER_NAME, &sni);
    }

    put_extension(&mut out, EXT_SUPPORTED_VERSIONS, &[2, 0x03, 0x04]);

    let mut groups = Vec::with_capacity(2 + params.groups.len() * 2);
    put_u16(&mut groups, (params.groups.len() * 2) as u16);
    for g in params.groups {
        put_u16(&mut groups, g.to_u16());
    }
    put_extension(&mut out, EXT_SUPPORTED_GROUPS, &groups);

    let mut sig_algs = Vec::with_capacity(2 + params.signature_schemes.len() * 2);
    put_u16(&mut sig_algs, (params.signature_schemes.len() * 2) as u16);
    for s in params.signature_schemes {
        put_u16(&mut sig_algs, s.to_u16());
    }
    put_extension(&mut out, EXT_SIGNATURE_ALGORITHMS, &sig_algs);

    // client_shares: length(2) + KeyShareEntry(group(2) + key(2 + n))
    let ks = params.key_share;
    let mut shares = Vec::with_capacity(6 + ks.key_exchange.len());
    put_u16(&mut shares, (4 + ks.key_exchange.len()) as u16);
    put_u16(&mut shares, ks.group);
    put_vec16(&mut shares, ks.key_exchange);
    put_extension(&mut out, EXT_KEY_SHARE, &shares);

    if !params.alpn.is_empty() {
        let mut list = Vec::new();
        for proto in params.alpn {
            put_vec8(&mut list, proto);
        }
        let mut alpn = Vec::with_capacity(2 + list.len());
        put_vec16(&mut alpn, &list);
        put_extension(&mut out, EXT_ALPN, &alpn);
    }

    if let Some(cookie) = params.cookie {
        let mut data = Vec::with_capacity(2 + cookie.len());
        put_vec16(&mut data, cookie);
        put_extension(&mut out, EXT_COOKIE, &data);
    }

    if let Some(tp) = params.transport_params {
        put_extension(&mut out, EXT_QUIC_TRANSPORT_PARAMS, tp);
    }

    for ext in params.custom {
        put_extension(&mut out, ext.ty, &ext.data);
    }

    if let Some((identity, obfuscated_age, binder_len)) = params.psk {
        put_extension(&mut out, EXT_PSK_KEY_EXCHANGE_MODES, &[1, PSK_DHE_KE]);
        if params.early_data {
            put_extension(&mut out, EXT_EARLY_DATA, &[]);
        }

        put_u16(&mut out, EXT_PRE_SHARED_KEY);
        let ext_at = begin_u16_len(&mut out);
        let ids_at = begin_u16_len(&mut out);
        put_vec16(&mut out, identity);
        put_u32(&mut out, obfuscated_age);
        patch_u16_len(&mut out, ids_at);
        put_u16(&mut out, (1 + binder_len) as u16);
        out.push(binder_len as u8);
        out.resize(out.len() + binder_len, 0);
        patch_u16_len(&mut out, ext_at);
    }

    out
}

fn parse_u16_list(data: &[u8], what: &'static str) -> Result<Vec<u16>> {
    let mut off = 0;
    let list = get_vec16(data, &mut off, what)?;
    expect_end(data, off, what)?;
    if list.len() % 2 != 0 {
        return Err(Error::Decode(what));
    }
    Ok(list
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect())
}

fn parse_key_share<'a>(data: &'a [u8], off: &mut usize) -> Result<KeyShareEntry<'a>> {
    let group = get_u16(data, off, "key_share")?;
    let key_exchange = get_vec16(data, off, "key_share")?;
    if key_exchange.is_empty() {
        return Err(Error::Decode("key_share"));
    }
    Ok(KeyShareEntry {
        group,
        key_exchange,
    })
}

fn parse_alpn_list(data: &[u8]) -> Result<Vec<&[u8]>> {
    let mut off = 0;
    let list = get_vec16(data, &mut off, "ALPN")?;
    expect_end(data, off, "ALPN")?;
    let mut protocols = Vec::new();
    let mut loff = 0;
    while loff < list.len() {
        let proto = get_vec8(list, &mut loff, "ALPN")?;
        if proto.is_empty() {
            return Err(Error::Decode("ALPN"));
        }
        protocols.push(proto);
    }
    if protocols.is_empty() {
        return Err(Error::Decode("ALPN"));
    }
    Ok(protocols)
}

fn parse_server_name(data: &[u8]) -> Result<Option<&str>> {
    let mut off = 0;
    let list = get_vec16(data, &mut off, "server_name")?;
    expect_end(data, off, "server_name")?;
    let mut loff = 0;
    let mut host = None;
    while loff < list.len() {
        let name_type = get_u8(list, &mut loff, "server_name")?;
        let name = get_vec16(list, &mut loff, "server_name")?;
        if name_type == 0 {
            if host.is_some() {
                return Err(Error::IllegalParameter("multiple host names"));
            }
            host = Some(core::str::from_utf8(name).map_err(|_| Error::Decode("server_name"))?);
        }
    }
    Ok(host)
}

fn parse_pre_shared_key(data: &[u8]) -> Result<OfferedPsks<'_>> {
    let mut off = 0;
    let ids = get_vec16(data, &mut off, "pre_shared_key identities")?;
    let binders_start = off;
    let binder_list = get_vec16(data, &mut off, "pre_shared_key binders")?;
    expect_end(data, off, "pre_shared_key")?;

    let mut identities = Vec::new();
    let mut ioff = 0;
    while ioff < ids.len() {
        let identity = get_vec16(ids, &mut ioff, "PskIdentity")?;
        let obfuscated_ticket_age = get_u32(ids, &mut ioff, "PskIdentity")?;
        identities.push(PskIdentity {
            identity,
            obfuscated_ticket_age,
        });
    }

    let mut binders = Vec::new();
    let mut boff = 0;
    while boff < binder_list.len() {
        let binder = get_vec8(binder_list, &mut boff, "PskBinderEntry")?;
        if binder.len() < 32 {
            return Err(Error::Decode("PskBinderEntry"));
        }
        binders.push(binder);
    }

    if identities.is_empty() || identities.len() != binders.len() {
        return Err(Error::IllegalParameter("PSK identity/binder count"));
    }

    Ok(OfferedPsks {
        identities,
        binders,
        binders_len: data.len() - binders_start,
    })
}

/// Parse ClientHello extensions.
pub fn parse_client_hello_extensions(data: &[u8]) -> Result<ClientHelloExtensions<'_>> {
    let mut result = ClientHelloExtensions::default();
    let exts = split_extensions(data)?;
    let count = exts.len();

    for (index, (ext_type, ext_data)) in exts.into_iter().enumerate() {
        match ext_type {
            EXT_SERVER_NAME => result.server_name = parse_server_name(ext_data)?,
            EXT_SUPPORTED_VERSIONS => {
                let mut off = 0;
                let list = get_vec8(ext_data, &mut off, "supported_versions")?;
                expect_end(ext_data, off, "supported_versions")?;
                if list.len() % 2 != 0 {
                    return Err(Error::Decode("supported_versions"));
                }
                result.supports_tls13 = list
                    .chunks_exact(2)
                    .any(|c| u16::from_be_bytes([c[0], c[1]]) == TLS13);
            }
            EXT_SUPPORTED_GROUPS => {
                result.supported_groups = parse_u16_list(ext_data, "supported_groups")?
            }
            EXT_SIGNATURE_ALGORITHMS => {
                result.signature_schemes = parse_u16_list(ext_data, "signature_algorithms")?
            }
            EXT_KEY_SHARE => {
                let mut off = 0;
                let shares = get_vec16(ext_data, &mut off, "key_share")?;
                expect_end(ext_data, off, "key_share")?;
                let mut soff = 0;
                while soff < shares.len() {
                    let entry = parse_key_share(shares, &mut soff)?;
                    if result.key_shares.iter().any(|e| e.group == entry.group) {
                        return Err(Error::IllegalParameter("duplicate key share group"));
                    }
                    result.key_shares.push(entry);
                }
            }
            EXT_ALPN => result.alpn_protocols = parse_alpn_list(ext_data)?,
            EXT_PSK_KEY_EXCHANGE_MODES => {
                let mut off = 0;
                let modes = get_vec8(ext_data, &mut off, "psk_key_exchange_modes")?;
                expect_end(ext_data, off, "psk_key_exchange_modes")?;
                result.psk_dhe_ke = modes.contains(&PSK_DHE_KE);
            }
            EXT_EARLY_DATA => {
                if !ext_data.is_empty() {
                    return Err(Error::Decode("early_data"));
                }
                result.early_data = true;
            }
            EXT_COOKIE => {
                let mut off = 0;
                let cookie = get_vec16(ext_data, &mut off, "cookie")?;
                expect_end(ext_data, off, "cookie")?;
                result.cookie = Some(cookie);
            }
            EXT_PRE_SHARED_KEY => {
                if index + 1 != count {
                    return Err(Error::IllegalParameter("pre_shared_key is not last"));
                }
                result.pre_shared_key = Some(parse_pre_shared_key(ext_data)?);
            }
            EXT_QUIC_TRANSPORT_PARAMS => result.transport_params = Some(ext_data),
            _ => {
                // Unknown extensions are left to the negotiation hook.
            }
        }
    }

    Ok(result)
}

/// Encode ServerHello extensions.
pub fn encode_server_hello_extensions(
    key_share: KeyShareEntry<'_>,
    selected_psk: Option<u16>,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + key_share.key_exchange.len());
    put_extension(&mut out, EXT_SUPPORTED_VERSIONS, &TLS13.to_be_bytes());

    let mut ks = Vec::with_capacity(4 + key_share.key_exchange.len());
    put_u16(&mut ks, key_share.group);
    put_vec16(&mut ks, key_share.key_exchange);
    put_extension(&mut out, EXT_KEY_SHARE, &ks);

    if let Some(index) = selected_psk {
        put_extension(&mut out, EXT_PRE_SHARED_KEY, &index.to_be_bytes());
    }
    out
}

/// Encode HelloRetryRequest extensions.
pub fn encode_retry_request_extensions(selected_group: u16, cookie: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    put_extension(&mut out, EXT_SUPPORTED_VERSIONS, &TLS13.to_be_bytes());
    put_extension(&mut out, EXT_KEY_SHARE, &selected_group.to_be_bytes());
    if let Some(cookie) = cookie {
        let mut data = Vec::with_capacity(2 + cookie.len());
        put_vec16(&mut data, cookie);
        put_extension(&mut out, EXT_COOKIE, &data);
    }
    out
}

/// Parse ServerHello (`is_retry == false`) or HelloRetryRequest extensions.
///
/// Extensions a server may not send in that message are rejected with
/// `unsupported_extension`.
pub fn parse_server_hello_extensions(
    data: &[u8],
    is_retry: bool,
) -> Result<ServerHelloExtensions<'_>> {
    let mut result = ServerHelloExtensions::default();

    for (ext_type, ext_data) in split_extensions(data)? {
        let mut off = 0;
        match (ext_type, is_retry) {
            (EXT_SUPPORTED_VERSIONS, _) => {
                result.selected_version = Some(get_u16(ext_data, &mut off, "supported_versions")?);
            }
            (EXT_KEY_SHARE, false) => {
                result.key_share = Some(parse_key_share(ext_data, &mut off)?);
            }
            (EXT_KEY_SHARE, true) => {
                result.selected_group = Some(get_u16(ext_data, &mut off, "key_share")?);
            }
            (EXT_PRE_SHARED_KEY, false) => {
                result.selected_psk = Some(get_u16(ext_data, &mut off, "pre_shared_key")?);
            }
            (EXT_COOKIE, true) => {
                let cookie = get_vec16(ext_data, &mut off, "cookie")?;
                if cookie.is_empty() {
                    return Err(Error::Decode("cookie"));
                }
                result.cookie = Some(cookie);
            }
            (_, false) => return Err(Error::UnsupportedExtension("ServerHello")),
            (_, true) => return Err(Error::UnsupportedExtension("HelloRetryRequest")),
        }
        expect_end(ext_data, off, "ServerHello extension")?;
    }

    Ok(result)
}

/// Encode EncryptedExtensions contents.
pub fn encode_encrypted_extensions_data(
    alpn: Option<&[u8]>,
    early_data: bool,
    transport_params: Option<&[u8]>,
    custom: &[CustomExtension],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);

    if let Some(proto) = alpn {
        let mut list = Vec::with_capacity(1 + proto.len());
        put_vec8(&mut list, proto);
        let mut data = Vec::with_capacity(2 + list.len());
        put_vec16(&mut data, &list);
        put_extension(&mut out, EXT_ALPN, &data);
    }

    if early_data {
        put_extension(&mut out, EXT_EARLY_DATA, &[]);
    }

    if let Some(tp) = transport_params {
        put_extension(&mut out, EXT_QUIC_TRANSPORT_PARAMS, tp);
    }

    for ext in custom {
        put_extension(&mut out, ext.ty, &ext.data);
    }

    out
}

/// Parse EncryptedExtensions contents.
pub fn parse_encrypted_extensions_data(data: &[u8]) -> Result<EncryptedExtensionsData<'_>> {
    let mut result = EncryptedExtensionsData::default();

    for (ext_type, ext_data) in split_extensions(data)? {
        match ext_type {
            EXT_ALPN => {
                let protocols = parse_alpn_list(ext_data)?;
                if protocols.len() != 1 {
                    return Err(Error::IllegalParameter("server ALPN must select one protocol"));
                }
                result.alpn = Some(protocols[0]);
            }
            EXT_EARLY_DATA => {
                if !ext_data.is_empty() {
                    return Err(Error::Decode("early_data"));
                }
                result.early_data = true;
            }
            EXT_QUIC_TRANSPORT_PARAMS => result.transport_params = Some(ext_data),
            EXT_SUPPORTED_VERSIONS
            | EXT_KEY_SHARE
            | EXT_PRE_SHARED_KEY
            | EXT_COOKIE
            | EXT_PSK_KEY_EXCHANGE_MODES
            | EXT_SIGNATURE_ALGORITHMS => {
                return Err(Error::UnsupportedExtension("EncryptedExtensions"))
            }
            _ => {}
        }
    }

    Ok(result)
}

/// NewSessionTicket extensions: `early_data` with `max_early_data_size`.
pub fn encode_ticket_extensions(max_early_data: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    if max_early_data > 0 {
        put_extension(&mut out, EXT_EARLY_DATA, &max_early_data.to_be_bytes());
    }
    out
}

/// `max_early_data_size` from NewSessionTicket extensions (0 if absent).
pub fn parse_ticket_extensions(data: &[u8]) -> Result<u32> {
    for (ext_type, ext_data) in split_extensions(data)? {
        if ext_type == EXT_EARLY_DATA {
            let mut off = 0;
            let max = get_u32(ext_data, &mut off, "early_data")?;
            expect_end(ext_data, off, "early_data")?;
            return Ok(max);
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_params<'a>(key: &'a [u8], alpn: &'a [Vec<u8>]) -> ClientHelloParams<'a> {
        ClientHelloParams {
            server_name: Some("example.com"),
            groups: &[NamedGroup::X25519, NamedGroup::Secp256r1],
            key_share: KeyShareEntry {
                group: NamedGroup::X25519.to_u16(),
                key_exchange: key,
            },
            signature_schemes: &[SignatureScheme::EcdsaSecp256r1Sha256, SignatureScheme::Ed25519],
            alpn,
            transport_params: Some(&[0x01, 0x01, 0x05]),
            cookie: None,
            early_data: false,
            custom: &[],
            psk: None,
        }
    }

    #[test]
    fn client_hello_extensions_roundtrip() {
        let alpn = [b"h3".to_vec(), b"hq-29".to_vec()];
        let buf = encode_client_hello_extensions(&client_params(&[0xAB; 32], &alpn));
        let parsed = parse_client_hello_extensions(&buf).unwrap();

        assert_eq!(parsed.server_name, Some("example.com"));
        assert!(parsed.supports_tls13);
        assert_eq!(parsed.supported_groups, [0x001d, 0x0017]);
        assert_eq!(parsed.signature_schemes, [0x0403, 0x0807]);
        assert_eq!(parsed.key_shares.len(), 1);
        assert_eq!(parsed.key_shares[0].key_exchange, &[0xAB; 32]);
        assert_eq!(parsed.alpn_protocols, [&b"h3"[..], &b"hq-29"[..]]);
        assert_eq!(parsed.transport_params, Some(&[0x01, 0x01, 0x05][..]));
        assert!(parsed.pre_shared_key.is_none());
        assert!(!parsed.early_data);
    }

    #[test]
    fn no_sni_when_absent() {
        let mut params = client_params(&[1; 32], &[]);
        params.server_name = None;
        let buf = encode_client_hello_extensions(&params);
        let parsed = parse_client_hello_extensions(&buf).unwrap();
        assert_eq!(parsed.server_name, None);
        assert!(parsed.alpn_protocols.is_empty());
    }

    #[test]
    fn pre_shared_key_is_last_with_binder_placeholder() {
        let mut params = client_params(&[1; 32], &[]);
        params.early_data = true;
        params.psk = Some((&[0x77; 20], 0xdeadbeef, 32));
        let buf = encode_client_hello_extensions(&params);

        // Binder list: u16 length(33) + u8 length(32) + 32 zero bytes.
        assert_eq!(&buf[buf.len() - 35..buf.len() - 32], &[0x00, 0x21, 0x20]);
        assert!(buf[buf.len() - 32..].iter().all(|&b| b == 0));

        let parsed = parse_client_hello_extensions(&buf).unwrap();
        assert!(parsed.psk_dhe_ke);
        assert!(parsed.early_data);
        let psk = parsed.pre_shared_key.unwrap();
        assert_eq!(psk.identities[0].identity, &[0x77; 20]);
        assert_eq!(psk.identities[0].obfuscated_ticket_age, 0xdeadbeef);
        assert_eq!(psk.binders_len, 35);
    }

    #[test]
    fn pre_shared_key_not_last_rejected() {
        let mut params = client_params(&[1; 32], &[]);
        params.psk = Some((&[0x77; 4], 0, 32));
        let mut buf = encode_client_hello_extensions(&params);
        buf.extend_from_slice(&[0xff, 0x01, 0x00, 0x00]);
        assert_eq!(
            parse_client_hello_extensions(&buf).err(),
            Some(Error::IllegalParameter("pre_shared_key is not last"))
        );
    }

    #[test]
    fn duplicate_extension_rejected() {
        let buf = [0x00, 0x2a, 0x00, 0x00, 0x00, 0x2a, 0x00, 0x00];
        assert_eq!(
            parse_client_hello_extensions(&buf).err(),
            Some(Error::IllegalParameter("duplicate extension"))
        );
    }

    #[test]
    fn server_hello_extensions_roundtrip() {
        let buf = encode_server_hello_extensions(
            KeyShareEntry {
                group: 0x001d,
                key_exchange: &[0x42; 32],
            },
            Some(0),
        );
        let parsed = parse_server_hello_extensions(&buf, false).unwrap();
        assert_eq!(parsed.selected_version, Some(TLS13));
        assert_eq!(parsed.key_share.unwrap().key_exchange, &[0x42; 32]);
        assert_eq!(parsed.selected_psk, Some(0));
    }

    #[test]
    fn retry_request_extensions() {
        let buf = encode_retry_request_extensions(0x0017, Some(&[9, 9, 9]));
        let parsed = parse_server_hello_extensions(&buf, true).unwrap();
        assert_eq!(parsed.selected_group, Some(0x0017));
        assert_eq!(parsed.cookie, Some(&[9u8, 9, 9][..]));

        // A cookie is not allowed in a regular ServerHello.
        assert_eq!(
            parse_server_hello_extensions(&buf, false).err(),
            Some(Error::Decode("key_share"))
        );
    }

    #[test]
    fn server_hello_rejects_alpn() {
        let buf = encode_encrypted_extensions_data(Some(b"h3"), false, None, &[]);
        assert_eq!(
            parse_server_hello_extensions(&buf, false).err(),
            Some(Error::UnsupportedExtension("ServerHello"))
        );
    }

    #[test]
    fn encrypted_extensions_roundtrip() {
        let custom = [CustomExtension::new(0xff01, [1u8, 2])];
        let buf = encode_encrypted_extensions_data(Some(b"h3"), true, Some(&[0x0e, 0x01, 0x04]), &custom);
        let parsed = parse_encrypted_extensions_data(&buf).unwrap();
        assert_eq!(parsed.alpn, Some(&b"h3"[..]));
        assert!(parsed.early_data);
        assert_eq!(parsed.transport_params, Some(&[0x0e, 0x01, 0x04][..]));
        assert_eq!(find_custom_extension(&buf, 0xff01).unwrap(), Some(&[1u8, 2][..]));
        assert_eq!(find_custom_extension(&buf, 0xff02).unwrap(), None);
    }

    #[test]
    fn encrypted_extensions_rejects_key_share() {
        let buf = encode_retry_request_extensions(0x001d, None);
        assert_eq!(
            parse_encrypted_extensions_data(&buf).err(),
            Some(Error::UnsupportedExtension("EncryptedExtensions"))
        );
    }

    #[test]
    fn ticket_extensions() {
        assert_eq!(parse_ticket_extensions(&encode_ticket_extensions(0xffff_ffff)).unwrap(), 0xffff_ffff);
        assert_eq!(parse_ticket_extensions(&encode_ticket_extensions(0)).unwrap(), 0);
    }

    #[test]
    fn builtin_extension_codes() {
        assert!(CustomExtension::new(EXT_KEY_SHARE, Vec::new()).is_builtin());
        assert!(!CustomExtension::new(0xff01, Vec::new()).is_builtin());
    }
}

//! 字体编码
//!
//! 把文字操作中的字符串按页面字体切分为字符编码，再解码为 Unicode。
//! 复合字体（Type0）使用双字节编码，优先通过 ToUnicode 映射解码；
//! 没有映射时按编码值本身解释。简单字体按单字节编码表解码。

use lopdf::{dictionary, Dictionary, Document, Encoding, Object, ObjectId};
use std::collections::HashMap;

/// 单个字体的解码器
pub(crate) struct FontDecoder<'a> {
    code_width: usize,
    encoding: Option<Encoding<'a>>,
}

impl<'a> FontDecoder<'a> {
    /// 未知字体：单字节，按 Latin-1 解释
    pub fn raw() -> Self {
        Self {
            code_width: 1,
            encoding: None,
        }
    }

    pub fn for_font(doc: &'a Document, font: &'a Dictionary) -> Self {
        let composite = font
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map(|name| name == b"Type0")
            .unwrap_or(false);
        Self {
            code_width: if composite { 2 } else { 1 },
            encoding: font_encoding(doc, font),
        }
    }

    /// 每个字符编码的字节数
    pub fn code_width(&self) -> usize {
        self.code_width
    }

    /// 切分字符编码，返回每个编码的字节区间
    pub fn codes(&self, bytes: &[u8]) -> Vec<(usize, usize)> {
        (0..bytes.len())
            .step_by(self.code_width)
            .map(|start| (start, (start + self.code_width).min(bytes.len())))
            .collect()
    }

    /// 解码单个字符编码；无法映射的单字节编码按 Latin-1，双字节编码按码点
    pub fn decode(&self, code: &[u8]) -> String {
        let value = code.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        match &self.encoding {
            Some(Encoding::UnicodeMapEncoding(cmap)) => match cmap.get(value as u16) {
                Some(units) => String::from_utf16_lossy(&units),
                None => self.fallback(value),
            },
            Some(encoding) => encoding
                .bytes_to_string(code)
                .ok()
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| self.fallback(value)),
            None => self.fallback(value),
        }
    }

    fn fallback(&self, value: u32) -> String {
        let c = if self.code_width == 1 {
            char::from(value as u8)
        } else {
            char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
        };
        c.to_string()
    }
}

/// 读取字体编码
///
/// 只在 `/Encoding` 为名称时交给 lopdf；只有 ToUnicode 的字体借用 Identity
/// 分支解析映射，差异表编码按原始字节处理。
fn font_encoding<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<Encoding<'a>> {
    let named = font.get(b"Encoding").and_then(Object::as_name).is_ok();
    if named && font.type_is(b"Font") {
        return match font.get_font_encoding(doc) {
            Ok(encoding) => Some(encoding),
            Err(e) => {
                log::debug!("[Font] 无法读取字体编码: {}", e);
                None
            }
        };
    }

    let to_unicode = font.get(b"ToUnicode").ok()?.clone();
    let shim = dictionary! {
        "Type" => "Font",
        "Encoding" => "Identity-H",
        "ToUnicode" => to_unicode,
    };
    match shim.get_font_encoding(doc) {
        Ok(Encoding::UnicodeMapEncoding(cmap)) => Some(Encoding::UnicodeMapEncoding(cmap)),
        Ok(_) => None,
        Err(e) => {
            log::debug!("[Font] 无法解析 ToUnicode: {}", e);
            None
        }
    }
}

/// 一页使用的字体（按资源名索引）
pub(crate) struct FontSet<'a> {
    decoders: HashMap<Vec<u8>, FontDecoder<'a>>,
    raw: FontDecoder<'a>,
}

impl Default for FontSet<'_> {
    fn default() -> Self {
        Self {
            decoders: HashMap::new(),
            raw: FontDecoder::raw(),
        }
    }
}

impl<'a> FontSet<'a> {
    pub fn for_page(doc: &'a Document, page_id: ObjectId) -> Self {
        let mut set = Self::default();
        match doc.get_page_fonts(page_id) {
            Ok(fonts) => {
                for (name, font) in fonts {
                    set.decoders.insert(name, FontDecoder::for_font(doc, font));
                }
            }
            Err(e) => log::debug!("[Font] 无法读取页面字体: {}", e),
        }
        set
    }

    /// 查找字体；未声明的字体按原始字节解码
    pub fn get(&self, name: &[u8]) -> &FontDecoder<'a> {
        self.decoders.get(name).unwrap_or(&self.raw)
    }
}

/// 字形编号 = 字符 - 29，常见于子集化嵌入字体
#[cfg(test)]
pub(crate) const OFFSET_CMAP: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo <<
/Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0003> <0061> <0020>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

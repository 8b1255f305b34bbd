//! 链接注释处理
//!
//! 删除 URI 指向水印域名的 Link 注释，其它注释保持不变

use crate::utils::resolve;
use lopdf::{Dictionary, Document, Object, ObjectId};
use scrub_core::WatermarkRules;

/// 移除页面中指向水印域名的链接注释
///
/// 返回删除数量。页面没有 Annots 时返回 0。
pub fn remove_watermark_links(
  doc: &mut Document,
  page_id: ObjectId,
  rules: &WatermarkRules,
) -> Result<usize, String> {
  // 首先获取 annots 数据（避免借用冲突）
  let annots: Vec<Object> = match doc.get_object(page_id) {
    Ok(Object::Dictionary(page_dict)) => match page_dict.get(b"Annots") {
      Ok(annots_ref) => get_annots(doc, annots_ref),
      Err(_) => return Ok(0),
    },
    _ => return Err(format!("无法获取页面 {:?}", page_id)),
  };

  if annots.is_empty() {
    return Ok(0);
  }

  let mut kept: Vec<Object> = Vec::with_capacity(annots.len());
  let mut removed_ids: Vec<ObjectId> = Vec::new();
  let mut removed = 0;

  for annot in annots {
    let is_target = resolve(doc, &annot)
      .and_then(|o| o.as_dict().ok())
      .map(|dict| is_watermark_link(doc, dict, rules))
      .unwrap_or(false);

    if is_target {
      removed += 1;
      if let Object::Reference(id) = annot {
        removed_ids.push(id);
      }
    } else {
      kept.push(annot);
    }
  }

  if removed == 0 {
    return Ok(0);
  }

  for annot_id in &removed_ids {
    doc.objects.remove(annot_id);
  }

  // 现在可以安全地修改页面字典
  if let Ok(Object::Dictionary(ref mut page_dict)) = doc.get_object_mut(page_id) {
    if kept.is_empty() {
      page_dict.remove(b"Annots");
    } else {
      page_dict.set("Annots", Object::Array(kept));
    }
  }

  log::info!("[Redact] 页面 {:?} 移除水印链接 {} 个", page_id, removed);
  Ok(removed)
}

/// 判断注释是否为指向水印域名的链接
fn is_watermark_link(doc: &Document, annot_dict: &Dictionary, rules: &WatermarkRules) -> bool {
  match annot_dict.get(b"Subtype") {
    Ok(Object::Name(subtype)) if subtype.as_slice() == b"Link" => {}
    _ => return false,
  }

  get_link_uri(doc, annot_dict)
    .map(|uri| rules.uri_matches(&uri))
    .unwrap_or(false)
}

/// 读取链接动作中的 URI
fn get_link_uri(doc: &Document, annot_dict: &Dictionary) -> Option<String> {
  let action = resolve(doc, annot_dict.get(b"A").ok()?)?.as_dict().ok()?;
  match resolve(doc, action.get(b"URI").ok()?)? {
    Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
    _ => None,
  }
}

/// 获取注释列表（Annots 可能是数组或指向数组的引用）
fn get_annots(doc: &Document, annots_ref: &Object) -> Vec<Object> {
  match resolve(doc, annots_ref) {
    Some(Object::Array(arr)) => arr.clone(),
    _ => Vec::new(),
  }
}

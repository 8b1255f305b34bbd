use lopdf::{Document, Object, ObjectId, Stream};

/// 从 Object 获取数值
pub fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// 获取流内容（支持压缩和未压缩的流）
pub fn get_stream_content(stream: &Stream) -> Vec<u8> {
    match stream.decompressed_content() {
        Ok(data) => data,
        Err(_) => stream.content.clone(),
    }
}

/// 获取页面的内容流数据
///
/// `Contents` 为数组时按顺序拼接，各段之间插入换行。页面没有内容时返回空数据。
pub fn get_page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, String> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| format!("无法获取页面 {:?}: {}", page_id, e))?;

    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Reference(ref_id) => match doc.get_object(*ref_id) {
            Ok(Object::Stream(stream)) => Ok(get_stream_content(stream)),
            Ok(Object::Array(arr)) => Ok(concat_streams(doc, arr)),
            _ => Err(format!("页面 {:?} 的内容流引用无效", page_id)),
        },
        Object::Array(arr) => Ok(concat_streams(doc, arr)),
        Object::Stream(stream) => Ok(get_stream_content(stream)),
        _ => Err(format!("页面 {:?} 的 Contents 类型无效", page_id)),
    }
}

fn concat_streams(doc: &Document, items: &[Object]) -> Vec<u8> {
    let mut all_content = Vec::new();
    for item in items {
        if let Object::Reference(ref_id) = item {
            if let Ok(Object::Stream(stream)) = doc.get_object(*ref_id) {
                all_content.extend(get_stream_content(stream));
                all_content.push(b'\n');
            }
        }
    }
    all_content
}

/// 解析引用，返回目标对象；非引用对象原样返回
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

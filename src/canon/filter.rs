//! FilterInfo (tag `0x4024`): creative filters applied in camera.

#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParam {
    pub tag: u32,
    pub values: Vec<i32>,
}

#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreativeFilter {
    pub id: u32,
    pub params: Vec<FilterParam>,
}

struct Words<'a> {
    data: &'a [u32],
    pos: usize,
    end: usize,
}

impl Words<'_> {
    fn next(&mut self) -> crate::Result<u32> {
        if self.pos >= self.end {
            return Err("filter info is truncated".into());
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }
}

/// Decodes FilterInfo: `size, count`, then per filter `id, size, nparams`
/// and `tag, count, values...` for each parameter. A filter's size counts
/// the bytes after its size field.
pub fn decode_filter_info(data: &[u32]) -> crate::Result<Vec<CreativeFilter>> {
    let mut words = Words {
        data,
        pos: 0,
        end: data.len(),
    };
    let _size = words.next()?;
    let count = words.next()?;

    let mut filters = Vec::new();
    for _ in 0..count {
        let id = words.next()?;
        let size = words.next()? as usize;
        let end = words.pos + size / 4;
        if end > data.len() {
            return Err("filter block exceeds filter info".into());
        }
        let mut block = Words {
            data,
            pos: words.pos,
            end,
        };
        let nparams = block.next()?;
        let mut params = Vec::new();
        for _ in 0..nparams {
            let tag = block.next()?;
            let n = block.next()?;
            let values = (0..n)
                .map(|_| block.next().map(|v| v as i32))
                .collect::<crate::Result<Vec<_>>>()?;
            params.push(FilterParam { tag, values });
        }
        filters.push(CreativeFilter { id, params });
        words.pos = end;
    }
    Ok(filters)
}

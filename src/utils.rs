use nom::{
    bytes::streaming::{tag, take_till},
    sequence::terminated,
    IResult,
};

/// Reads a NUL terminated string and consumes the terminator. Invalid UTF-8
/// is replaced; a missing terminator is `Incomplete`.
pub(crate) fn parse_cstr(input: &[u8]) -> IResult<&[u8], String> {
    let (remain, bytes) = terminated(take_till(|b| b == 0), tag(b"\0"))(input)?;
    Ok((remain, String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::case;

    #[case(b"", None)]
    #[case(b"\0", Some(""))]
    #[case(b"XML:com.adobe.xmp\0\0", Some("XML:com.adobe.xmp"))]
    #[case(b"h\xff\0", Some("h\u{fffd}"))]
    #[case(b"mime", None)]
    fn cstr(data: &[u8], expect: Option<&str>) {
        let res = parse_cstr(data);
        match expect {
            Some(s) => assert_eq!(res.unwrap().1, s),
            None => assert!(res.unwrap_err().is_incomplete()),
        }
    }
}

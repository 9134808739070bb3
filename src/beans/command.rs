/// shell 命令, 可以是完整字符串也可以是参数列表
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug)]
pub enum AdbCommand<'a> {
    Slice(&'a [&'a str]),
    String(&'a str),
}

impl<'a> AdbCommand<'a> {
    pub fn get_command(&self) -> String {
        match self {
            AdbCommand::Slice(s) => s.join(" "),
            AdbCommand::String(s) => s.to_string(),
        }
    }
}

impl<'a> From<&'a str> for AdbCommand<'a> {
    fn from(value: &'a str) -> Self {
        AdbCommand::String(value)
    }
}

impl<'a> From<&'a String> for AdbCommand<'a> {
    fn from(value: &'a String) -> Self {
        AdbCommand::String(value.as_str())
    }
}

impl<'a> From<&'a [&'a str]> for AdbCommand<'a> {
    fn from(value: &'a [&'a str]) -> Self {
        AdbCommand::Slice(value)
    }
}

impl<'a, const N: usize> From<&'a [&'a str; N]> for AdbCommand<'a> {
    fn from(value: &'a [&'a str; N]) -> Self {
        AdbCommand::Slice(value)
    }
}

impl<'a> From<&'a Vec<&'a str>> for AdbCommand<'a> {
    fn from(value: &'a Vec<&'a str>) -> Self {
        AdbCommand::Slice(value)
    }
}

/// 用双引号包裹参数, 转义其中的 `"` 和 `\`
pub fn quote_arg(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into() {
        let a = "a";
        let b = ["a", "b", "c"];
        let c = vec![a, "b", "c"];
        assert_eq!(AdbCommand::String(a), a.into());
        assert_eq!(AdbCommand::Slice(&b), (&b).into());
        assert_eq!(AdbCommand::Slice(&c), (&c).into());
        assert_eq!(AdbCommand::from(&b).get_command(), "a b c");
    }

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("/data/local/tmp/a b.apk"), "\"/data/local/tmp/a b.apk\"");
        assert_eq!(quote_arg(r#"x"y\z"#), r#""x\"y\\z""#);
    }
}

pub(crate) fn positive_u8(v: &str) -> Result<u8, String> {
    let val = v.parse::<u8>().map_err(|_| "must be numeric".to_owned())?;
    if val > 0 {
        Ok(val)
    } else {
        Err("must be > 0".to_owned())
    }
}

pub(crate) fn positive_usize(v: &str) -> Result<usize, String> {
    let val = v.parse::<usize>().map_err(|_| "must be numeric".to_owned())?;
    if val > 0 {
        Ok(val)
    } else {
        Err("must be > 0".to_owned())
    }
}

pub(crate) fn aspect_latitude(v: &str) -> Result<f64, String> {
    let val = v.parse::<f64>().map_err(|_| "must be numeric".to_owned())?;

    if val <= -90_f64 {
        return Err("must be > -90°".to_owned());
    } else if val >= 90_f64 {
        return Err("must be < 90°".to_owned());
    }

    Ok(val)
}

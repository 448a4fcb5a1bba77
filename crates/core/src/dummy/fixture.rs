use super::{DummyStatus, DummyTicket};
use crate::domain::customer::CustomerId;

pub(super) static TICKETS: &[DummyTicket] = &[
    DummyTicket {
        id: 1,
        customer_name: "Ali Khan",
        customer_id: CustomerId(101),
        question: "How to reset my password?",
        answer: "Go to settings > Reset Password.",
        category: "account",
        status: DummyStatus::Resolved,
    },
    DummyTicket {
        id: 2,
        customer_name: "Sara Ahmed",
        customer_id: CustomerId(102),
        question: "What is your refund policy?",
        answer: "Refunds available within 30 days.",
        category: "billing",
        status: DummyStatus::Confirmed,
    },
    DummyTicket {
        id: 3,
        customer_name: "Bilal Hussain",
        customer_id: CustomerId(103),
        question: "Do you support mobile app?",
        answer: "Yes, both iOS and Android are available.",
        category: "general",
        status: DummyStatus::Resolved,
    },
    DummyTicket {
        id: 4,
        customer_name: "Ayesha Malik",
        customer_id: CustomerId(104),
        question: "How can I update my email?",
        answer: "Go to Profile > Edit Email.",
        category: "account",
        status: DummyStatus::Pending,
    },
    DummyTicket {
        id: 5,
        customer_name: "Omar Farooq",
        customer_id: CustomerId(105),
        question: "Can I change my subscription plan?",
        answer: "Yes, upgrade/downgrade anytime in settings.",
        category: "billing",
        status: DummyStatus::Confirmed,
    },
    DummyTicket {
        id: 6,
        customer_name: "Hina Gul",
        customer_id: CustomerId(106),
        question: "Where can I download invoices?",
        answer: "Go to Billing > Download Invoice.",
        category: "billing",
        status: DummyStatus::Resolved,
    },
    DummyTicket {
        id: 7,
        customer_name: "Zain Ali",
        customer_id: CustomerId(107),
        question: "Is there 24/7 support available?",
        answer: "Yes, we provide round-the-clock support.",
        category: "support",
        status: DummyStatus::Confirmed,
    },
    DummyTicket {
        id: 8,
        customer_name: "Fatima Noor",
        customer_id: CustomerId(108),
        question: "How do I delete my account?",
        answer: "Submit a request via Privacy Settings.",
        category: "account",
        status: DummyStatus::Pending,
    },
    DummyTicket {
        id: 9,
        customer_name: "Imran Shah",
        customer_id: CustomerId(109),
        question: "Do you offer student discounts?",
        answer: "Yes, 20% student discount is available.",
        category: "billing",
        status: DummyStatus::Resolved,
    },
    DummyTicket {
        id: 10,
        customer_name: "Maryam Javed",
        customer_id: CustomerId(110),
        question: "Can I recover deleted files?",
        answer: "Sorry, deleted files cannot be recovered.",
        category: "general",
        status: DummyStatus::Confirmed,
    },
];
